//! Harvest pipeline tests over in-memory fetch and storage doubles

use crate::support::{
    category_html, product_html, profile, root_html, settings, url, MemorySink, StubFetcher,
};
use catalog_ripper::crawler::{Fetch, PoolSettings, RetailerScraper};
use catalog_ripper::output::FailureStage;
use catalog_ripper::storage::{AssetNamer, FsImageSink, ImageSink};
use catalog_ripper::{HarvestReport, RipperError};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn scraper(
    roots: &[&str],
    fetcher: &Arc<StubFetcher>,
    sink: &Arc<MemorySink>,
    workers: usize,
) -> RetailerScraper {
    let fetcher: Arc<dyn Fetch> = fetcher.clone();
    let sink: Arc<dyn ImageSink> = sink.clone();
    RetailerScraper::new(profile(roots), fetcher, sink).with_settings(settings(workers))
}

/// Root `/catA` -> category `/cat1` -> products p1 and p2
fn single_category_site() -> StubFetcher {
    StubFetcher::new()
        .page("/catA", root_html(&["/cat1"]))
        .page(
            "/cat1",
            category_html(&["/product/p1", "/product/p2", "/about"], None),
        )
        .page(
            "/product/p1",
            product_html(&["/img/p1_front.jpg", "/img/p1_swatch.jpg"]),
        )
        .page(
            "/product/p2",
            product_html(&["/img/p2_front.jpg", "/img/p2_back.jpg"]),
        )
        .image("/img/p1_front.jpg")
        .image("/img/p1_swatch.jpg")
        .image("/img/p2_front.jpg")
        .image("/img/p2_back.jpg")
}

#[tokio::test]
async fn test_empty_root_pages_fails_without_work() {
    let fetcher = Arc::new(StubFetcher::new());
    let sink = Arc::new(MemorySink::new());

    let result = scraper(&[], &fetcher, &sink, 2)
        .process(&CancellationToken::new())
        .await;

    assert!(matches!(result, Err(RipperError::EmptyRootPages)));
    assert!(fetcher.requests().is_empty());
    assert_eq!(sink.write_count(), 0);
}

#[tokio::test]
async fn test_cancelled_before_start_fails_without_work() {
    let fetcher = Arc::new(single_category_site());
    let sink = Arc::new(MemorySink::new());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = scraper(&["/catA"], &fetcher, &sink, 2).process(&cancel).await;

    assert!(matches!(result, Err(RipperError::Cancelled)));
    assert!(fetcher.requests().is_empty());
    assert_eq!(sink.write_count(), 0);
}

#[tokio::test]
async fn test_single_category_harvest() {
    let fetcher = Arc::new(single_category_site());
    let sink = Arc::new(MemorySink::new());

    let report = scraper(&["/catA"], &fetcher, &sink, 2)
        .process(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(sink.names(), vec!["p1_front", "p2_back", "p2_front"]);
    assert_eq!(report.pages_visited, 2);
    assert_eq!(report.products_discovered, 2);
    assert_eq!(report.products_processed, 2);
    assert_eq!(report.images_written, 3);
    assert_eq!(report.swatches_skipped, 1);
    assert!(report.is_clean(), "unexpected failures: {:?}", report.failures);
    assert!(report.finished_at.is_some());

    assert_eq!(fetcher.request_count("/product/p1"), 1);
    assert_eq!(fetcher.request_count("/product/p2"), 1);
    // Links outside the product path never reach the frontier
    assert_eq!(fetcher.request_count("/about"), 0);
}

#[tokio::test]
async fn test_pagination_chain_is_followed_to_the_end() {
    let fetcher = Arc::new(
        StubFetcher::new()
            .page("/root", root_html(&["/cat1"]))
            .page("/cat1", category_html(&["/product/a"], Some("/cat2")))
            .page("/cat2", category_html(&["/product/b"], Some("/cat3")))
            .page("/cat3", category_html(&["/product/c"], None))
            .page("/product/a", product_html(&["/img/a.jpg"]))
            .page("/product/b", product_html(&["/img/b.jpg"]))
            .page("/product/c", product_html(&["/img/c.jpg"]))
            .image("/img/a.jpg")
            .image("/img/b.jpg")
            .image("/img/c.jpg"),
    );
    let sink = Arc::new(MemorySink::new());

    let report = scraper(&["/root"], &fetcher, &sink, 3)
        .process(&CancellationToken::new())
        .await
        .unwrap();

    for page in ["/cat1", "/cat2", "/cat3"] {
        assert_eq!(fetcher.request_count(page), 1, "{} fetched once", page);
    }
    assert_eq!(report.products_discovered, 3);
    assert_eq!(sink.names(), vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_pagination_cycle_terminates() {
    let fetcher = Arc::new(
        StubFetcher::new()
            .page("/root", root_html(&["/cat1"]))
            .page("/cat1", category_html(&["/product/a"], Some("/cat2")))
            .page("/cat2", category_html(&["/product/b"], Some("/cat1")))
            .page("/product/a", product_html(&["/img/a.jpg"]))
            .page("/product/b", product_html(&["/img/b.jpg"]))
            .image("/img/a.jpg")
            .image("/img/b.jpg"),
    );
    let sink = Arc::new(MemorySink::new());

    let report = tokio::time::timeout(
        Duration::from_secs(5),
        scraper(&["/root"], &fetcher, &sink, 2).process(&CancellationToken::new()),
    )
    .await
    .expect("cyclic pagination must terminate")
    .unwrap();

    assert_eq!(fetcher.request_count("/cat1"), 1);
    assert_eq!(fetcher.request_count("/cat2"), 1);
    assert_eq!(report.products_discovered, 2);
}

#[tokio::test]
async fn test_product_fetch_failure_is_isolated() {
    let fetcher = Arc::new(
        StubFetcher::new()
            .page("/root", root_html(&["/cat1"]))
            .page(
                "/cat1",
                category_html(&["/product/broken", "/product/ok"], None),
            )
            .status("/product/broken", 500)
            .page("/product/ok", product_html(&["/img/ok_main.jpg"]))
            .image("/img/ok_main.jpg"),
    );
    let sink = Arc::new(MemorySink::new());

    let report = scraper(&["/root"], &fetcher, &sink, 2)
        .process(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(sink.names(), vec!["ok_main"]);
    assert_eq!(report.products_processed, 2);

    let failures: Vec<_> = report.failures_at(FailureStage::ProductPage).collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].url, url("/product/broken"));
    assert!(failures[0].message.contains("500"));
}

#[tokio::test]
async fn test_image_fetch_failure_skips_only_that_image() {
    let fetcher = Arc::new(
        StubFetcher::new()
            .page("/root", root_html(&["/cat1"]))
            .page("/cat1", category_html(&["/product/p"], None))
            .page(
                "/product/p",
                product_html(&["/img/gone.jpg", "/img/here.jpg"]),
            )
            .transport_error("/img/gone.jpg")
            .image("/img/here.jpg"),
    );
    let sink = Arc::new(MemorySink::new());

    let report = scraper(&["/root"], &fetcher, &sink, 1)
        .process(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(sink.names(), vec!["here"]);
    assert_eq!(report.failures_at(FailureStage::Image).count(), 1);
}

#[tokio::test]
async fn test_write_failure_is_recorded_and_pool_continues() {
    let fetcher = Arc::new(single_category_site());
    let sink = Arc::new(MemorySink::new().failing_on("p1_front"));

    let report = scraper(&["/catA"], &fetcher, &sink, 2)
        .process(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(sink.names(), vec!["p2_back", "p2_front"]);
    assert_eq!(report.products_processed, 2);
    assert_eq!(report.images_written, 2);

    let failures: Vec<_> = report.failures_at(FailureStage::Write).collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].url, url("/img/p1_front.jpg"));
}

#[tokio::test]
async fn test_root_page_failure_is_reported() {
    let fetcher = Arc::new(single_category_site().status("/down", 503));
    let sink = Arc::new(MemorySink::new());

    let report = scraper(&["/down", "/catA"], &fetcher, &sink, 2)
        .process(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.failures_at(FailureStage::RootPage).count(), 1);
    // The healthy root page is harvested regardless
    assert_eq!(report.images_written, 3);
}

#[tokio::test]
async fn test_slow_discovery_loses_no_products() {
    let fetcher = Arc::new(
        StubFetcher::new()
            .page("/fast", root_html(&["/fast-cat"]))
            .page(
                "/fast-cat",
                category_html(&["/product/f1", "/product/f2"], None),
            )
            .page("/slow", root_html(&["/slow-cat"]))
            .delay("/slow", Duration::from_millis(150))
            .page(
                "/slow-cat",
                category_html(&["/product/s1", "/product/s2"], Some("/slow-cat-2")),
            )
            .page("/slow-cat-2", category_html(&["/product/s3"], None))
            .delay("/slow-cat-2", Duration::from_millis(100))
            .page("/product/f1", product_html(&["/img/f1.jpg"]))
            .page("/product/f2", product_html(&["/img/f2.jpg"]))
            .page("/product/s1", product_html(&["/img/s1.jpg"]))
            .page("/product/s2", product_html(&["/img/s2.jpg"]))
            .page("/product/s3", product_html(&["/img/s3.jpg"]))
            .image("/img/f1.jpg")
            .image("/img/f2.jpg")
            .image("/img/s1.jpg")
            .image("/img/s2.jpg")
            .image("/img/s3.jpg"),
    );
    let sink = Arc::new(MemorySink::new());

    let report = scraper(&["/fast", "/slow"], &fetcher, &sink, 2)
        .process(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.products_discovered, 5);
    assert_eq!(report.products_processed, 5);
    assert_eq!(sink.names(), vec!["f1", "f2", "s1", "s2", "s3"]);
}

#[tokio::test]
async fn test_each_product_is_processed_exactly_once() {
    let products: Vec<String> = (0..40).map(|i| format!("/product/item{}", i)).collect();
    let product_refs: Vec<&str> = products.iter().map(String::as_str).collect();

    let mut stub = StubFetcher::new()
        .page("/root", root_html(&["/cat1"]))
        .page("/cat1", category_html(&product_refs, None));
    for (i, product) in products.iter().enumerate() {
        let image = format!("/img/item{}_main.jpg", i);
        stub = stub.page(product, product_html(&[image.as_str()])).image(&image);
    }
    let fetcher = Arc::new(stub);
    let sink = Arc::new(MemorySink::new());

    let report = scraper(&["/root"], &fetcher, &sink, 4)
        .process(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.products_processed, 40);
    assert_eq!(sink.write_count(), 40);
    for product in &products {
        assert_eq!(fetcher.request_count(product), 1, "{} fetched once", product);
    }
}

#[tokio::test]
async fn test_tiny_frontier_applies_backpressure_without_loss() {
    let products: Vec<String> = (0..10).map(|i| format!("/product/q{}", i)).collect();
    let product_refs: Vec<&str> = products.iter().map(String::as_str).collect();

    let mut stub = StubFetcher::new()
        .page("/root", root_html(&["/cat1"]))
        .page("/cat1", category_html(&product_refs, None));
    for (i, product) in products.iter().enumerate() {
        let image = format!("/img/q{}.jpg", i);
        stub = stub.page(product, product_html(&[image.as_str()])).image(&image);
    }
    let fetcher = Arc::new(stub);
    let sink = Arc::new(MemorySink::new());

    let pool = PoolSettings {
        frontier_capacity: 1,
        ..settings(1)
    };
    let fetcher_dyn: Arc<dyn Fetch> = fetcher.clone();
    let sink_dyn: Arc<dyn ImageSink> = sink.clone();
    let report = RetailerScraper::new(profile(&["/root"]), fetcher_dyn, sink_dyn)
        .with_settings(pool)
        .process(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.products_processed, 10);
    assert_eq!(sink.write_count(), 10);
}

#[tokio::test]
async fn test_long_image_names_are_truncated() {
    let long_name = "a".repeat(80);
    let image_path = format!("/img/{}.jpg", long_name);
    let fetcher = Arc::new(
        StubFetcher::new()
            .page("/root", root_html(&["/cat1"]))
            .page("/cat1", category_html(&["/product/p"], None))
            .page("/product/p", product_html(&[image_path.as_str()]))
            .image(&image_path),
    );
    let sink = Arc::new(MemorySink::new());

    scraper(&["/root"], &fetcher, &sink, 1)
        .process(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(sink.names(), vec!["a".repeat(50)]);
}

#[tokio::test]
async fn test_custom_swatch_marker() {
    let fetcher = Arc::new(single_category_site());
    let sink = Arc::new(MemorySink::new());

    let pool = PoolSettings {
        namer: AssetNamer::new("back", 50),
        ..settings(2)
    };
    let fetcher_dyn: Arc<dyn Fetch> = fetcher.clone();
    let sink_dyn: Arc<dyn ImageSink> = sink.clone();
    let report = RetailerScraper::new(profile(&["/catA"]), fetcher_dyn, sink_dyn)
        .with_settings(pool)
        .process(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(sink.names(), vec!["p1_front", "p1_swatch", "p2_front"]);
    assert_eq!(report.swatches_skipped, 1);
}

#[tokio::test]
async fn test_cancellation_mid_run_stops_promptly() {
    let fetcher = Arc::new(
        single_category_site()
            .delay("/product/p1", Duration::from_secs(30))
            .delay("/product/p2", Duration::from_secs(30)),
    );
    let sink = Arc::new(MemorySink::new());
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let report = tokio::time::timeout(
        Duration::from_secs(5),
        scraper(&["/catA"], &fetcher, &sink, 2).process(&cancel),
    )
    .await
    .expect("cancelled harvest must return promptly")
    .unwrap();

    assert!(report.cancelled);
    assert!(!report.is_clean());
    assert_eq!(sink.write_count(), 0);
    assert!(report.failures.is_empty(), "cancelled fetches are not failures");
}

#[tokio::test]
async fn test_process_products_skips_discovery() {
    let fetcher = Arc::new(single_category_site());
    let sink = Arc::new(MemorySink::new());

    let report = scraper(&["/catA"], &fetcher, &sink, 2)
        .process_products(vec![url("/product/p2")], &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(sink.names(), vec!["p2_back", "p2_front"]);
    assert_eq!(report.products_discovered, 1);
    assert_eq!(report.products_processed, 1);
    assert_eq!(report.pages_visited, 0);
    assert_eq!(fetcher.request_count("/catA"), 0);
}

#[tokio::test]
async fn test_process_products_rejects_empty_list() {
    let fetcher = Arc::new(single_category_site());
    let sink = Arc::new(MemorySink::new());

    let result = scraper(&["/catA"], &fetcher, &sink, 2)
        .process_products(Vec::new(), &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(RipperError::EmptyProductList)));
    assert!(fetcher.requests().is_empty());
}

/// Harvests into a real directory and returns the report plus `(stem, bytes)` per file
async fn harvest_to_disk(
    fetcher: StubFetcher,
    roots: &[&str],
    output: &Path,
) -> (HarvestReport, Vec<(String, Vec<u8>)>) {
    let fetcher: Arc<dyn Fetch> = Arc::new(fetcher);
    let sink: Arc<dyn ImageSink> = Arc::new(FsImageSink::new(output, "jpeg"));

    let report = RetailerScraper::new(profile(roots), fetcher, sink)
        .with_settings(settings(2))
        .process(&CancellationToken::new())
        .await
        .unwrap();

    let mut files: Vec<(String, Vec<u8>)> = std::fs::read_dir(output)
        .unwrap()
        .map(|entry| {
            let path = entry.unwrap().path();
            let stem = path.file_stem().unwrap().to_string_lossy().into_owned();
            (stem, std::fs::read(&path).unwrap())
        })
        .collect();
    files.sort();
    (report, files)
}

#[tokio::test]
async fn test_images_sharing_a_basename_get_separate_files() {
    let output = TempDir::new().unwrap();
    let fetcher = StubFetcher::new()
        .page("/root", root_html(&["/cat1"]))
        .page("/cat1", category_html(&["/product/p1", "/product/p2"], None))
        .page("/product/p1", product_html(&["/img/a/main.jpg"]))
        .page("/product/p2", product_html(&["/img/b/main.jpg"]))
        .image("/img/a/main.jpg")
        .image("/img/b/main.jpg");

    let (report, files) = harvest_to_disk(fetcher, &["/root"], output.path()).await;

    assert_eq!(report.images_written, 2);
    assert_eq!(files.len(), 2);
    assert!(files.iter().any(|(stem, _)| stem == "main"));
    assert!(files.iter().all(|(stem, _)| stem.starts_with("main")));

    let contents: HashSet<&[u8]> = files.iter().map(|(_, body)| body.as_slice()).collect();
    assert!(contents.contains(b"/img/a/main.jpg".as_slice()));
    assert!(contents.contains(b"/img/b/main.jpg".as_slice()));
}

#[tokio::test]
async fn test_names_equal_after_truncation_get_separate_files() {
    let output = TempDir::new().unwrap();
    let first = format!("/img/{}_front.jpg", "x".repeat(60));
    let second = format!("/img/{}_back.jpg", "x".repeat(60));
    let fetcher = StubFetcher::new()
        .page("/root", root_html(&["/cat1"]))
        .page("/cat1", category_html(&["/product/p"], None))
        .page("/product/p", product_html(&[first.as_str(), second.as_str()]))
        .image(&first)
        .image(&second);

    let (report, files) = harvest_to_disk(fetcher, &["/root"], output.path()).await;

    assert_eq!(report.images_written, 2);
    assert_eq!(files.len(), 2);
    assert_ne!(files[0].0, files[1].0);
    for (stem, _) in &files {
        assert!(stem.chars().count() <= 50, "{} exceeds the length bound", stem);
    }
}

#[tokio::test]
async fn test_repeated_image_url_is_written_once() {
    let output = TempDir::new().unwrap();
    let fetcher = StubFetcher::new()
        .page("/root", root_html(&["/cat1"]))
        .page("/cat1", category_html(&["/product/p1", "/product/p2"], None))
        .page("/product/p1", product_html(&["/img/brand_logo.jpg"]))
        .page("/product/p2", product_html(&["/img/brand_logo.jpg"]))
        .image("/img/brand_logo.jpg");

    let (report, files) = harvest_to_disk(fetcher, &["/root"], output.path()).await;

    assert_eq!(report.images_written, 1);
    assert_eq!(report.duplicates_skipped, 1);
    assert_eq!(files, vec![("brand_logo".to_string(), b"/img/brand_logo.jpg".to_vec())]);
}


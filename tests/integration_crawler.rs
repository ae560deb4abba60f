#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

use news_qa::QaError;
use news_qa::crawler::{DocumentSource, NewsScraper, ScraperConfig};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SECTION_PAGE: &str = r#"
<!DOCTYPE html>
<html>
<body>
    <div class="list">
        <article>
            <h2 class="title"><a href="/2026/10/19/senate-budget">Senate passes budget, heads to House</a></h2>
        </article>
        <article>
            <h2 class="title"><a href="/2026/10/19/coastal-storm">Storm hits the coast</a></h2>
        </article>
        <aside>
            <h3 class="title"><a href="/podcasts/">Podcasts</a></h3>
        </aside>
    </div>
</body>
</html>
"#;

const BUDGET_STORY: &str = r#"
<html>
<body>
    <h1>Senate passes budget</h1>
    <div id="storytext" class="storytext">
        <p>The Senate voted 51-49 on Sunday, sending the bill to the House.</p>
        <p>Leaders said	the vote was close.</p>
    </div>
</body>
</html>
"#;

const STORM_STORY: &str = r#"
<html>
<body>
    <div class="storytext">
        <p>A storm knocked out power to thousands.</p>
    </div>
</body>
</html>
"#;

fn scraper_config(server: &MockServer) -> ScraperConfig {
    ScraperConfig {
        news_url: format!("{}/sections/news/", server.uri()),
        timeout_seconds: 5,
        rate_limit_ms: 0,
        max_retries: 1,
        retry_delay_seconds: 0,
        ..ScraperConfig::default()
    }
}

async fn mount_page(server: &MockServer, page_path: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn setup_news_site(server: &MockServer) {
    mount_page(server, "/sections/news/", SECTION_PAGE).await;
    mount_page(server, "/2026/10/19/senate-budget", BUDGET_STORY).await;
    mount_page(server, "/2026/10/19/coastal-storm", STORM_STORY).await;
}

fn init_test_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter("news_qa=debug")
        .with_test_writer()
        .try_init()
        .ok();
}

#[tokio::test]
async fn scrapes_every_linked_article() {
    init_test_tracing();
    let server = MockServer::start().await;
    setup_news_site(&server).await;
    let config = scraper_config(&server);

    let documents = tokio::task::spawn_blocking(move || {
        NewsScraper::new(&config)?.fetch_documents()
    })
    .await
    .expect("task should join")
    .expect("scrape should succeed");

    assert_eq!(documents.len(), 2);

    assert_eq!(documents[0].title, "Senate passes budget heads to House");
    assert_eq!(
        documents[0].url,
        format!("{}/2026/10/19/senate-budget", server.uri())
    );
    assert_eq!(
        documents[0].content,
        "The Senate voted 51-49 on Sunday sending the bill to the House. Leaders said the vote was close."
    );

    assert_eq!(documents[1].title, "Storm hits the coast");
    assert_eq!(
        documents[1].content,
        "A storm knocked out power to thousands."
    );
}

#[tokio::test]
async fn max_articles_limits_fetches() {
    let server = MockServer::start().await;
    mount_page(&server, "/sections/news/", SECTION_PAGE).await;
    Mock::given(method("GET"))
        .and(path("/2026/10/19/senate-budget"))
        .respond_with(ResponseTemplate::new(200).set_body_string(BUDGET_STORY))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/2026/10/19/coastal-storm"))
        .respond_with(ResponseTemplate::new(200).set_body_string(STORM_STORY))
        .expect(0)
        .mount(&server)
        .await;

    let config = ScraperConfig {
        max_articles: 1,
        ..scraper_config(&server)
    };
    let documents = tokio::task::spawn_blocking(move || NewsScraper::new(&config)?.scrape())
        .await
        .expect("task should join")
        .expect("scrape should succeed");

    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].title, "Senate passes budget heads to House");
}

#[tokio::test]
async fn article_without_story_is_scrape_error() {
    let server = MockServer::start().await;
    mount_page(&server, "/sections/news/", SECTION_PAGE).await;
    mount_page(&server, "/2026/10/19/senate-budget", BUDGET_STORY).await;
    mount_page(
        &server,
        "/2026/10/19/coastal-storm",
        "<html><body><p>Live coverage</p></body></html>",
    )
    .await;
    let config = scraper_config(&server);

    let result = tokio::task::spawn_blocking(move || NewsScraper::new(&config)?.scrape())
        .await
        .expect("task should join");

    assert!(
        matches!(result, Err(QaError::Scrape(message)) if message.contains("/2026/10/19/coastal-storm"))
    );
}

#[tokio::test]
async fn section_without_headlines_is_scrape_error() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/sections/news/",
        "<html><body><h2>Nothing here</h2></body></html>",
    )
    .await;
    let config = scraper_config(&server);

    let result = tokio::task::spawn_blocking(move || NewsScraper::new(&config)?.scrape())
        .await
        .expect("task should join");

    assert!(matches!(result, Err(QaError::Scrape(message)) if message.contains("no headlines")));
}

#[tokio::test]
async fn missing_section_page_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sections/news/"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    let config = scraper_config(&server);

    let result = tokio::task::spawn_blocking(move || NewsScraper::new(&config)?.scrape())
        .await
        .expect("task should join");

    assert!(matches!(result, Err(QaError::Scrape(message)) if message.contains("404")));
}

#[tokio::test]
async fn server_error_is_retried() {
    init_test_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sections/news/"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    setup_news_site(&server).await;
    let config = scraper_config(&server);

    let documents = tokio::task::spawn_blocking(move || NewsScraper::new(&config)?.scrape())
        .await
        .expect("task should join")
        .expect("second attempt should succeed");

    assert_eq!(documents.len(), 2);
}

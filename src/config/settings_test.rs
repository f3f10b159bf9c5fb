use super::*;

#[test]
fn test_defaults_cover_every_option() {
    let settings = Settings::default();

    assert_eq!(settings.crawler.request_delay_ms, 500);
    assert_eq!(settings.crawler.fetch_timeout(), Duration::from_secs(10));
    assert!(!settings.crawler.bypass_robots_policy);
    assert_eq!(settings.crawler.max_crawl_depth, 2);
    assert_eq!(settings.crawler.max_pages_per_domain, 30);
    assert_eq!(settings.crawler.rate_limit_interval_ms, 800);
    assert_eq!(settings.crawler.request_retries, 3);
    assert_eq!(settings.verifier.verification_timeout(), Duration::from_secs(3));
    assert!(!settings.verifier.mock_dns_mode);
    assert_eq!(settings.pipeline.page_worker_concurrency, 5);
    assert_eq!(settings.pipeline.verify_worker_concurrency, 10);
    assert_eq!(settings.pipeline.max_emails_per_page, 100);
    assert_eq!(settings.pipeline.max_total_emails, 500);
    assert!(settings.pipeline.timeout_protection_enabled);
    assert_eq!(settings.pipeline.role_prefixes.len(), DEFAULT_ROLE_PREFIXES.len());
}

#[test]
fn test_gate_interval_uses_larger_spacing() {
    let mut crawler = CrawlerSettings::default();
    assert_eq!(crawler.gate_interval(), Duration::from_millis(800));

    crawler.request_delay_ms = 1200;
    assert_eq!(crawler.gate_interval(), Duration::from_millis(1200));
}

#[test]
fn test_attempts_never_zero() {
    let crawler = CrawlerSettings {
        request_retries: 0,
        ..Default::default()
    };
    assert_eq!(crawler.attempts(), 1);
}

#[test]
fn test_loader_applies_defaults_and_env_overrides() {
    std::env::set_var("EMAILSCOPE__VERIFIER__MOCK_DNS_MODE", "true");
    std::env::set_var("EMAILSCOPE__CRAWLER__MAX_PAGES_PER_DOMAIN", "8");

    let settings = Settings::new().expect("settings should load");

    std::env::remove_var("EMAILSCOPE__VERIFIER__MOCK_DNS_MODE");
    std::env::remove_var("EMAILSCOPE__CRAWLER__MAX_PAGES_PER_DOMAIN");

    assert!(settings.verifier.mock_dns_mode);
    assert_eq!(settings.crawler.max_pages_per_domain, 8);
    assert_eq!(settings.server.port, 5000);
    assert_eq!(settings.pipeline.role_prefixes.len(), 8);
}

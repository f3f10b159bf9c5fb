// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 性能基准测试套件
//!
//! 覆盖页面文本提取、邮箱抽取和评分这几条热路径。

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use emailscope::config::settings::{PipelineSettings, Settings};
use emailscope::domain::models::email::EmailSource;
use emailscope::domain::services::extraction_service::ExtractionService;
use emailscope::domain::services::verification_service::VerificationService;
use emailscope::utils::text_processing::html_to_text;
use std::hint::black_box;
use tokio::runtime::Runtime;

/// 生成包含若干段落和联系方式的页面
fn sample_page(paragraphs: usize) -> String {
    let mut html = String::from("<html><head><script>var t = 1;</script></head><body>");
    for i in 0..paragraphs {
        html.push_str(&format!(
            "<p>Paragraph {i} talks about services. Contact person{i}@example.com \
             or <a href=\"mailto:desk{i}@example.com\">the desk</a>.</p>"
        ));
    }
    html.push_str("</body></html>");
    html
}

fn benchmark_html_to_text(c: &mut Criterion) {
    let mut group = c.benchmark_group("html_to_text");
    for size in [10, 100, 1000].iter() {
        let page = sample_page(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &page, |b, page| {
            b.iter(|| black_box(html_to_text(page)));
        });
    }
    group.finish();
}

fn benchmark_extraction(c: &mut Criterion) {
    let extractor = ExtractionService::new(&PipelineSettings::default());
    let mut group = c.benchmark_group("extraction");
    for size in [10, 100, 1000].iter() {
        let text = html_to_text(&sample_page(*size));
        group.bench_with_input(BenchmarkId::new("extract", size), &text, |b, text| {
            b.iter(|| black_box(extractor.extract(text, "example.com")));
        });
    }
    group.finish();
}

/// 模拟 DNS 模式下的验证，只衡量语法检查和评分
fn benchmark_mock_verification(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut settings = Settings::default();
    settings.verifier.mock_dns_mode = true;
    let verifier = VerificationService::new(None, &settings.verifier, &settings.pipeline);
    let emails: Vec<String> = (0..100).map(|i| format!("user{}@example.com", i)).collect();

    c.bench_function("verify_100_mock", |b| {
        b.iter(|| {
            rt.block_on(async {
                for email in &emails {
                    black_box(verifier.verify(email, EmailSource::Found).await);
                }
            })
        });
    });
}

criterion_group!(
    benches,
    benchmark_html_to_text,
    benchmark_extraction,
    benchmark_mock_verification
);
criterion_main!(benches);

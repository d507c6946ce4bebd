#![feature(test)]
extern crate test;

use chrono::{Duration, Utc};
use servicebody_backend::model::visitor::Visitor;
use servicebody_backend::util::analytics::{build_report, DateRange};
use servicebody_backend::util::time::to_iso;
use servicebody_backend::util::user_agent::parse_user_agent;
use test::Bencher;

const CHROME: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

fn visitors(n: usize) -> Vec<Visitor> {
    let now = Utc::now();
    (0..n)
        .map(|i| {
            let at = to_iso(now - Duration::minutes(i as i64 * 7));
            let mut v = Visitor::new(format!("10.0.{}.{}", i / 250, i % 250), &at);
            v.page_views = (i % 9) as u32 + 1;
            v.current_page = Some(format!("/services/{}", i % 25));
            v.referrer = (i % 3 == 0).then(|| "https://www.google.com/".to_string());
            v.country = ["AU", "NZ", "US"][i % 3].to_string();
            v
        })
        .collect()
}

/// 30 day report over ten thousand records
#[bench]
fn bench_build_report(b: &mut Bencher) {
    let records = visitors(10_000);
    let range = DateRange::resolve(Some("30d"), None, None, Utc::now()).unwrap();
    b.iter(|| build_report(&records, &range));
}

#[bench]
fn bench_parse_user_agent(b: &mut Bencher) {
    b.iter(|| parse_user_agent(CHROME));
}

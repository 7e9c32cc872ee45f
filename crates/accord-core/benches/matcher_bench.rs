use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use accord_core::dsl::{ContractBuilder, JsonObject};
use accord_core::matchers::{MatchingRule, PathExpr, RuleSet};
use accord_core::model::{ActualRequest, Contract};
use accord_core::{match_request, match_values, Value};
use serde_json::json;

fn order_json(lines: usize) -> serde_json::Value {
    let lines: Vec<_> = (0..lines)
        .map(|i| json!({"sku": format!("SKU-{i}"), "qty": i, "price": 9.99}))
        .collect();
    json!({"id": 42, "customer": {"name": "Jane", "tier": "gold"}, "lines": lines})
}

fn order_rules() -> RuleSet {
    let mut rules = RuleSet::new();
    rules.add(PathExpr::parse("$.id").unwrap(), MatchingRule::any_type());
    rules.add(PathExpr::parse("$.lines").unwrap(), MatchingRule::min_type(1));
    rules.add(
        PathExpr::parse("$.lines[*].sku").unwrap(),
        MatchingRule::regex("SKU-[0-9]+").unwrap(),
    );
    rules
}

fn contract_with(count: usize) -> Contract {
    let mut builder = ContractBuilder::new("bench-consumer", "bench-provider")
        .upon_receiving("endpoint 0")
        .method("GET")
        .path("/api/v1/endpoint0")
        .will_respond_with()
        .status(200)
        .body(JsonObject::new().integer_type("id", 0));
    for i in 1..count {
        builder = builder
            .upon_receiving(format!("endpoint {i}"))
            .method("GET")
            .path(format!("/api/v1/endpoint{i}"))
            .will_respond_with()
            .status(200)
            .body(JsonObject::new().integer_type("id", i as i64));
    }
    builder.build().unwrap()
}

fn bench_value_matching(c: &mut Criterion) {
    let mut group = c.benchmark_group("value_matching");

    for lines in [1, 10, 100, 1000].iter() {
        let expected = Value::from(order_json(1));
        let actual = Value::from(order_json(*lines));
        let exact = Value::from(order_json(*lines));
        let rules = order_rules();
        let no_rules = RuleSet::new();

        group.throughput(Throughput::Elements(*lines as u64));
        group.bench_with_input(BenchmarkId::new("with_rules", lines), lines, |b, _| {
            b.iter(|| match_values(black_box(&expected), black_box(&actual), black_box(&rules)))
        });
        group.bench_with_input(BenchmarkId::new("exact", lines), lines, |b, _| {
            b.iter(|| match_values(black_box(&exact), black_box(&actual), black_box(&no_rules)))
        });
    }

    group.finish();
}

fn bench_request_routing(c: &mut Criterion) {
    let mut group = c.benchmark_group("request_routing");

    for count in [10, 50, 100].iter() {
        let contract = contract_with(*count);
        let last = ActualRequest::new("GET", &format!("/api/v1/endpoint{}", count - 1));

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::new("match_last", count), count, |b, _| {
            b.iter(|| {
                contract
                    .http_interactions()
                    .filter_map(|(_, interaction)| interaction.request())
                    .find(|expected| match_request(expected, black_box(&last)).is_match())
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_value_matching, bench_request_routing);
criterion_main!(benches);

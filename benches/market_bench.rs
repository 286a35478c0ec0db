use criterion::{Criterion, criterion_group, criterion_main};
use lazy_static::lazy_static;
use mesh_strike::{AssetKey, MarketGraph, MarketUpdate};

lazy_static! {
    static ref WETH: AssetKey = AssetKey::new("uni", "WETH");
    static ref USDT: AssetKey = AssetKey::new("uni", "USDT");
}

fn test_market_fill() -> eyre::Result<()> {
    let mut market = MarketGraph::new();
    market.upsert_edge(&WETH, &USDT, 3000.0)?;
    market.upsert_edge(&USDT, &WETH, 1.0 / 3001.0)?;

    for i in 0..1000 {
        let asset = AssetKey::new("uni", format!("TKN{}", i));
        market.upsert_edge(&WETH, &asset, 1.0 + i as f64 / 1000.0)?;
        market.upsert_edge(&asset, &USDT, 3000.0 / (1.0 + i as f64 / 1000.0))?;
    }

    // second pass overwrites every edge in place
    for i in 0..1000 {
        market.apply_update(&MarketUpdate::new("uni", "WETH", format!("TKN{}", i), 1.001 + i as f64 / 1000.0))?;
        let rate = 2999.0 / (1.0 + i as f64 / 1000.0);
        market.apply_update(&MarketUpdate::new("uni", format!("TKN{}", i), "USDT", rate))?;
    }

    Ok(())
}

fn benchmark_market_fill(c: &mut Criterion) {
    let mut group = c.benchmark_group("market");
    group.sample_size(10);

    group.bench_function("test_market_fill", |b| b.iter(test_market_fill));
    group.finish();
}

criterion_group!(benches, benchmark_market_fill);
criterion_main!(benches);

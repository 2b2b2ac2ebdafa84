//! # Dashboard Snapshot Example
//!
//! This example builds a small securities universe, feeds it through the
//! analytics facade and prints the artifacts a dashboard would render.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --example dashboard_snapshot
//! ```
//!
//! ## What it demonstrates
//!
//! - Ingesting price series, insider transactions and fundamentals
//! - Taking one consistent analytics snapshot
//! - Correlation, sector growth, anomaly and ratio artifacts
//! - Composite-versus-basket divergence

use std::collections::BTreeMap;

use finsight_analytics::{AnalyticsFacade, Selection};
use finsight_core::{
    DateWindow, FiscalPeriod, FundamentalsRecord, Industry, InsiderTransaction, Measure,
    PricePoint, Sector, Security, Ticker, TradeSide, TradingDay, UtcDateTime,
};

/// Daily closes drifting along a repeating percent pattern.
fn build_series(
    start: f64,
    pattern_pct: &[f64],
    days: usize,
    volume_spike_at: Option<usize>,
) -> Result<Vec<PricePoint>, Box<dyn std::error::Error>> {
    let mut day = TradingDay::parse("2024-01-01")?;
    let mut close = start;
    let mut points = Vec::with_capacity(days);
    for i in 0..days {
        day = day.next().ok_or("ran out of calendar")?;
        let open = close;
        close = open * (1.0 + pattern_pct[i % pattern_pct.len()] / 100.0);
        let high = open.max(close) * 1.002;
        let low = open.min(close) * 0.998;
        let volume = if volume_spike_at == Some(i) {
            9_000_000
        } else {
            1_000_000
        };
        points.push(PricePoint::new(day, open, high, low, close, volume)?);
    }
    Ok(points)
}

fn fmt_measure(measure: &Measure) -> String {
    match measure.value() {
        Some(value) => format!("{value:+.3}"),
        None => String::from("   n/a"),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let facade = AnalyticsFacade::new();
    let days = 26;

    // === Universe ===
    let energy = Sector::parse("Energy")?;
    let utilities = Sector::parse("Utilities")?;
    let funds = Sector::parse("Funds")?;

    let nvo = Ticker::parse("NVO")?;
    let arx = Ticker::parse("ARX")?;
    let gld = Ticker::parse("GLD")?;
    let enx = Ticker::parse("ENX")?;

    println!("🧭 Ingesting {days} days for 4 securities...");
    facade.ingest_series(
        Security::new(nvo.clone(), energy.clone(), Industry::parse("Oil & Gas")?),
        build_series(100.0, &[0.8, -0.4, 0.6, 0.2], days, Some(days - 1))?,
    )?;
    facade.ingest_series(
        Security::new(arx.clone(), energy.clone(), Industry::parse("Oil Services")?),
        build_series(80.0, &[0.7, -0.3, 0.5, 0.1], days, None)?,
    )?;
    facade.ingest_series(
        Security::new(gld.clone(), utilities.clone(), Industry::parse("Water")?),
        build_series(60.0, &[-0.2, 0.3, -0.1, 0.2], days, None)?,
    )?;
    facade.ingest_series(
        Security::new(enx.clone(), funds.clone(), Industry::parse("Sector ETF")?),
        build_series(90.0, &[0.74, -0.36, 0.56, 0.14], days, None)?,
    )?;

    // A burst of four distinct buyers inside one trading week.
    let buy = |when: &str, who: &str, quantity: f64, price: f64| {
        Ok::<_, Box<dyn std::error::Error>>(InsiderTransaction::new(
            nvo.clone(),
            who,
            UtcDateTime::parse(when)?,
            TradeSide::Buy,
            quantity,
            price,
        )?)
    };
    facade.record_transactions(vec![
        buy("2024-01-22T14:30:00Z", "A. Lind", 2_000.0, 104.0)?,
        buy("2024-01-23T10:05:00Z", "B. Mercer", 1_500.0, 104.5)?,
        buy("2024-01-24T15:45:00Z", "C. Ochoa", 3_000.0, 105.0)?,
        buy("2024-01-25T09:40:00Z", "D. Tran", 1_000.0, 105.2)?,
    ])?;

    // Three quarters of fundamentals; the last one is loss-making.
    facade.ingest_fundamentals(
        &nvo,
        vec![
            FundamentalsRecord::new(nvo.clone(), FiscalPeriod::quarterly(2023, 2)?, 1.10, 210.0e6, 32.0e6, 96.0)?,
            FundamentalsRecord::new(nvo.clone(), FiscalPeriod::quarterly(2023, 3)?, 1.25, 220.0e6, 35.0e6, 101.0)?,
            FundamentalsRecord::new(nvo.clone(), FiscalPeriod::quarterly(2023, 4)?, -0.20, 205.0e6, -6.0e6, 98.0)?,
        ],
    )?;

    let summary = facade.summary();
    println!(
        "   {} securities, {} points, {} sectors, store version {}",
        summary.securities,
        summary.total_points,
        summary.sectors.len(),
        summary.data_version
    );

    // === Snapshot ===
    let window = DateWindow::new(
        TradingDay::parse("2024-01-01")?,
        TradingDay::parse("2024-01-31")?,
    )?;
    let selection = Selection::new(
        vec![nvo.clone(), arx.clone(), gld.clone(), enx.clone()],
        window,
    );
    let snapshot = facade.snapshot(&selection);

    println!("\n🔗 Return correlation");
    println!("{}", "=".repeat(50));
    print!("{:>8}", "");
    for ticker in snapshot.correlation.tickers() {
        print!("{:>8}", ticker.as_str());
    }
    println!();
    for row in snapshot.correlation.tickers() {
        print!("{:>8}", row.as_str());
        for col in snapshot.correlation.tickers() {
            let cell = snapshot
                .correlation
                .get(row, col)
                .ok_or("matrix cell missing")?;
            print!("{:>8}", fmt_measure(&cell));
        }
        println!();
    }

    println!("\n📈 Sector growth (last day of each series)");
    println!("{}", "=".repeat(50));
    for sector_series in &snapshot.growth.sectors {
        if let Some(latest) = sector_series.series.last() {
            println!(
                "  {:<12} {} on {} ({} contributors)",
                sector_series.sector.to_string(),
                fmt_measure(&latest.growth),
                latest.day,
                latest.contributors
            );
        }
    }
    println!("  Ranking:");
    for (position, rank) in snapshot.growth.ranking.iter().enumerate() {
        println!(
            "    {}. {:<12} mean {}",
            position + 1,
            rank.sector.to_string(),
            fmt_measure(&rank.mean_growth)
        );
    }

    println!("\n🚨 Anomalies");
    println!("{}", "=".repeat(50));
    for report in &snapshot.anomalies {
        if report.flags.is_empty() {
            continue;
        }
        println!(
            "  {} (confidence {:.2}):",
            report.ticker, report.confidence
        );
        for flag in &report.flags {
            println!(
                "    {} {:?} {:?} severity {:.2}",
                flag.day, flag.kind, flag.level, flag.severity
            );
        }
    }

    println!("\n🧾 Ratios");
    println!("{}", "=".repeat(50));
    for ratio in &snapshot.ratios {
        println!(
            "  {} {}: P/E {}  margin {}  growth {}",
            ratio.ticker,
            ratio.period,
            fmt_measure(&ratio.pe),
            fmt_measure(&ratio.net_margin),
            fmt_measure(&ratio.revenue_growth)
        );
    }

    // === Divergence against the two energy holdings ===
    let mut holdings = BTreeMap::new();
    holdings.insert(nvo, 0.5);
    holdings.insert(arx, 0.5);
    let divergence = facade.divergence(&enx, &holdings, &window)?;
    println!("\n⚖️  {} vs basket", divergence.composite);
    println!("{}", "=".repeat(50));
    println!(
        "  {} common days, current {}, max {}, crossovers {}",
        divergence.days.len(),
        fmt_measure(&divergence.stats.current),
        fmt_measure(&divergence.stats.max),
        divergence.stats.crossovers
    );

    println!("\n📋 Snapshot meta");
    println!("{}", serde_json::to_string_pretty(&snapshot.meta)?);

    Ok(())
}

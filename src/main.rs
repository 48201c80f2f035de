//! Callgate demo
//!
//! Builds a chain of tiers (origin first), harvests a small catalog at the
//! origin, navigates into a section and prints what every tier sees.

use anyhow::Result;
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use callgate::chain::LoopbackResolver;
use callgate::{
    CallContext, CallHarvester, CallInfo, CallOutput, CatalogFeed, ChainConfig, ParamInfo, ParamType, SectionKey, Tier,
};

fn sample_feed(owner: &str) -> CatalogFeed {
    CatalogFeed::new()
        .global(
            CallInfo::new("Ping", "Answers pong")
                .with_category("General")
                .declared_by(owner)
                .into_sync(|_, _| Ok(CallOutput::success(json!("pong")))),
        )
        .section(
            SectionKey::root(),
            vec![CallInfo::new("OpenBasic", "Opens the basic section")
                .with_category("Nav")
                .declared_by(owner)
                .into_sync(|_, _| Ok(CallOutput::from_value(json!("basic"))))],
        )
        .section(
            "basic",
            vec![CallInfo::new("Echo", "Echoes its text")
                .with_category("Basic")
                .with_examples(vec!["basic_echo(\"hello\")".to_string()])
                .with_param(ParamInfo::new("text", "Text to echo", ParamType::String))
                .declared_by(owner)
                .into_sync(|_, args| Ok(CallOutput::from_value(args[0].clone())))],
        )
}

/// Build tiers end-of-chain first so every tier can resolve its upstream
fn build_chain(config: &ChainConfig) -> Result<Vec<Arc<Tier>>> {
    let mut tiers: Vec<Arc<Tier>> = Vec::new();
    for tier_config in config.tier_configs().iter().rev() {
        let tier = match tiers.last() {
            None => Tier::local(tier_config)?,
            Some(upstream) => Tier::chained(tier_config, Arc::new(LoopbackResolver::new(upstream.clone())))?,
        };
        tiers.push(tier);
    }
    tiers.reverse();
    Ok(tiers)
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("callgate=info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).init();

    let config = ChainConfig::from_env()?;
    let tiers = build_chain(&config)?;
    let Some(origin) = tiers.first().cloned() else {
        anyhow::bail!("No tiers configured");
    };

    let user = config.user.unwrap_or_default();
    let scope = origin.scope(user);
    let token = CancellationToken::new();

    println!("\n{}", "═".repeat(60));
    println!("Callgate demo: {}", config.tiers.join(" -> "));
    println!("{}\n", "═".repeat(60));

    let harvester = CallHarvester::new(origin.registry().clone(), origin.catalog().clone());
    harvester.harvest(&sample_feed(origin.name()), &scope, &token).await?;

    let mut idle = origin.gate().subscribe_idle();
    origin.gate().go("basic".into(), &scope);
    origin.gate().wait_for_idle(None, &scope, None, &token).await?;
    if let Ok(event) = idle.try_recv() {
        info!("Gate idle for ({}).", event.scope);
    }

    for tier in &tiers {
        let visible: Vec<String> = tier.registry().summary(Some(user)).into_keys().collect();
        println!("{:<8} path {:<10} calls {:?}", tier.name(), tier.stack().path(&scope), visible);
    }

    let mut ctx = CallContext::for_user(user);
    let output = origin
        .registry()
        .invoke("basic_echo", Some(user), &mut ctx, vec![json!("hello")])?;
    println!("\nbasic_echo(\"hello\") => {}", serde_json::to_string(&output)?);

    // upstream tiers only hold descriptors, so invoking there reports a failure
    if let Some(end) = tiers.last().filter(|_| tiers.len() > 1) {
        let output = end
            .registry()
            .invoke("basic_echo", Some(user), &mut ctx, vec![json!("hello")])?;
        println!("{}: basic_echo(\"hello\") => {}", end.name(), serde_json::to_string(&output)?);
    }

    Ok(())
}

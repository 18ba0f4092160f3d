//! Re-attachment to cached operations — `sandctl resume`.

use anyhow::Result;

use sandctl::cache::ResumeCache;
use sandctl::config::ConfigEffects;
use sandctl::orchestrator::{JsonFeed, Orchestrator, ResumeTarget};
use sandctl::ui::StageRenderer;

use super::super::Cli;

pub async fn cmd_resume(cli: &Cli, name: Option<&str>) -> Result<i32> {
    let dir = super::resolve_config_dir(cli)?;

    let mut cache = ResumeCache::open_in(&dir)?;
    let mut effects = ConfigEffects::new(dir.clone());
    let ui = if cli.json {
        StageRenderer::hidden()
    } else {
        StageRenderer::new()
    };
    let mut feed = JsonFeed::new(tokio::io::stdin());

    let target = match name {
        Some(name) => ResumeTarget::Name(name.to_string()),
        None => ResumeTarget::MostRecent,
    };

    let outcome = Orchestrator::new(&mut cache, &mut effects, &ui)
        .resume(target, &mut feed)
        .await?;

    super::emit_response(cli, &outcome)?;
    Ok(outcome.exit_code())
}

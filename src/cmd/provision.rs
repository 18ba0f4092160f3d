//! Sandbox provisioning tracking — `sandctl create` and `sandctl refresh`.

use anyhow::{Result, bail};

use sandctl::cache::{ResumeCache, UserPreferences};
use sandctl::config::{ConfigEffects, ToolConfig};
use sandctl::orchestrator::{JsonFeed, Orchestrator};
use sandctl::request::{self, RequestOverlay, SandboxAction, SandboxRequest};
use sandctl::ui::StageRenderer;

use super::super::{Cli, ProvisionArgs};

pub async fn cmd_provision(cli: &Cli, action: SandboxAction, args: &ProvisionArgs) -> Result<i32> {
    let dir = super::resolve_config_dir(cli)?;

    let definition = args
        .definition_file
        .as_deref()
        .map(request::load_definition)
        .transpose()?;

    // Refresh addresses an existing sandbox; a generated name would silently
    // target nothing.
    let named = args.name.is_some()
        || definition
            .as_ref()
            .is_some_and(|d| d.sandbox_name.is_some());
    if action == SandboxAction::Refresh && !named {
        bail!(
            "Refresh requires a sandbox name; pass --name or a definition file that sets one"
        );
    }

    let overrides = RequestOverlay {
        sandbox_name: args.name.clone(),
        license_type: args.license_type.clone(),
        description: args.description.clone(),
        source_sandbox: args.source_sandbox.clone(),
        apex_class_id: None,
    };
    let request = SandboxRequest::merged(definition, overrides);

    let config = ToolConfig::load(&dir)?;
    let target = args
        .target_org
        .clone()
        .or_else(|| config.default_target().map(String::from));
    let Some(target) = target else {
        bail!("No production org specified; pass --target-org or set a default target org");
    };
    // The flag accepts either a username or a previously assigned alias.
    let prod_org_username = config
        .alias_for(&target)
        .map(String::from)
        .unwrap_or(target);

    let prefs = UserPreferences {
        alias: args.alias.clone(),
        set_default: args.set_default,
        tracks_source: action == SandboxAction::Refresh || request.source_sandbox.is_some(),
    };

    let mut cache = ResumeCache::open_in(&dir)?;
    let mut effects = ConfigEffects::new(dir.clone());
    let ui = if cli.json {
        StageRenderer::hidden()
    } else {
        StageRenderer::new()
    };
    let mut feed = JsonFeed::new(tokio::io::stdin());

    let outcome = Orchestrator::new(&mut cache, &mut effects, &ui)
        .start(request, action, &prod_org_username, prefs, &mut feed)
        .await?;

    super::emit_response(cli, &outcome)?;
    Ok(outcome.exit_code())
}

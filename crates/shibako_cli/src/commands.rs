use std::path::Path;
use std::sync::Arc;

use miette::Result;
use rand::SeedableRng;
use rand::rngs::StdRng;
use shibako_core::translate::{DeepL, Translator};
use shibako_core::transliterate::default_transliterator;
use shibako_core::{
    ChannelId, ConfigHandle, IncomingMessage, ReplyKind, Triage, TriggerConfig, UserId, triage,
};
use shibako_discord::DiscordBotBuilder;
use shibako_discord::sender::mention;
use tracing::{error, info, warn};

use crate::RunArgs;
use crate::output::Output;

/// Load the trigger document and connect to Discord until Ctrl-C.
pub async fn run(config_path: &Path, args: RunArgs) -> Result<()> {
    let triggers = ConfigHandle::default();
    let loaded = triggers.reload(config_path).await?;
    info!(
        "Loaded {} phrases from {}",
        loaded.phrase_count(),
        config_path.display()
    );
    for phrase in loaded.shadowed_by_prefix(&args.prefix) {
        warn!(
            "Trigger '{}' starts with the command prefix '{}' and will never fire",
            phrase, args.prefix
        );
    }

    let translator: Option<Arc<dyn Translator>> = match args
        .deepl_api_key
        .as_deref()
        .map(str::trim)
        .filter(|key| !key.is_empty())
    {
        Some(key) => Some(Arc::new(DeepL::new(key, args.deepl_api_url)?)),
        None => {
            warn!("DEEPL_API_KEY is not set, translation commands are disabled");
            None
        }
    };

    let transliterator = default_transliterator();
    if transliterator.is_none() {
        warn!("Built without a Japanese converter, romaji and furigana are disabled");
    }

    let admins: Vec<UserId> = args.admins.into_iter().map(UserId).collect();
    if admins.is_empty() {
        info!("No admin users configured, reload is disabled");
    }

    let bot = DiscordBotBuilder::new(args.token, triggers)
        .with_prefix(args.prefix)
        .with_admin_users(admins)
        .with_config_path(config_path)
        .with_transliterator(transliterator)
        .with_translator(translator)
        .build()
        .await?;

    bot.run_until(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    })
    .await?;

    info!("Shibako stopped");
    Ok(())
}

/// Validate the trigger document and print what it contains.
pub async fn check(config_path: &Path, prefix: &str, output: &Output) -> Result<()> {
    let config = TriggerConfig::load(config_path).await?;

    output.section("Trigger document");
    output.info("Path:", &config_path.display().to_string());
    output.info("Phrases:", &config.phrase_count().to_string());
    output.info("Emoji:", config.emoji());

    let rude = config.rude_policy();
    if rude.is_armed() {
        output.info("Rude chance:", &format!("{:.1}%", rude.chance * 100.0));
    } else if rude.chance > 0.0 {
        output.warning("rude_response.message has no {message_sender}, rude replies never fire");
    } else {
        output.status("Rude replies disabled");
    }

    for phrase in config.shadowed_by_prefix(prefix) {
        output.warning(&shadowed_warning(phrase, prefix));
    }

    if !config.is_empty() {
        output.section("Rules");
        for (phrase, rule) in config.entries() {
            output.list_item(&describe_rule(phrase, &rule.name, &rule.response, rule.allow_rude));
        }
    }

    println!();
    output.success("Configuration is valid");
    Ok(())
}

fn shadowed_warning(phrase: &str, prefix: &str) -> String {
    format!("'{phrase}' starts with the command prefix '{prefix}' and will never fire")
}

fn describe_rule(phrase: &str, name: &str, response: &str, allow_rude: bool) -> String {
    let mut line = format!("{phrase} -> {response}");
    if !name.is_empty() {
        line.push_str(&format!(" [{name}]"));
    }
    if allow_rude {
        line.push_str(" (rude allowed)");
    }
    line
}

/// Show the reply plan `text` would get without connecting anywhere.
pub async fn simulate(
    config_path: &Path,
    text: &str,
    author: u64,
    prefix: &str,
    seed: Option<u64>,
    output: &Output,
) -> Result<()> {
    let config = TriggerConfig::load(config_path).await?;
    let author = UserId(author);
    let message = IncomingMessage::new(ChannelId(0), author, text, None, prefix);
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    output.section("Simulation");
    output.info("Message:", text);
    match triage(&config, &message, &mention(author), &mut rng) {
        Triage::Ignored(reason) => output.status(&format!("Ignored ({reason:?})")),
        Triage::NoMatch => output.status("No trigger matched"),
        Triage::Planned { rule, plan } => {
            let kind = match plan.kind {
                ReplyKind::Standard => "standard",
                ReplyKind::Rude => "rude",
            };
            output.info("Rule:", &rule.name);
            output.info("Reply:", kind);
            for step in &plan.steps {
                output.list_item(&format!("after {}s: {}", step.delay.as_secs(), step.text));
            }
        }
    }
    Ok(())
}

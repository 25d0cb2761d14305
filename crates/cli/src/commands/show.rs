//! `apeiron show` - Deep dive into a single topic.

use std::fmt::Write;
use std::sync::Arc;

use apeiron_config::AppConfig;
use apeiron_core::topic::TopicDetail;
use apeiron_oracle::{ContentResolver, RetryPolicy, StaticCatalog};

const RELATED_COUNT: usize = 3;

pub async fn run(id: &str, title: Option<String>) -> super::CommandResult {
    let config = super::load_config()?;
    let catalog = super::load_catalog(&config)?;
    show(&config, catalog, id, title).await
}

/// Resolve and print `id`, then suggest a few related topics.
pub(super) async fn show(
    config: &AppConfig,
    catalog: Arc<StaticCatalog>,
    id: &str,
    title: Option<String>,
) -> super::CommandResult {
    if catalog.detail(id).is_none() {
        super::require_api_key(config)?;
    }

    let provider = super::default_provider(config)?;
    let resolver = ContentResolver::new(provider, catalog.clone(), config.model())
        .with_policy(RetryPolicy::from(&config.resilience))
        .with_temperature(config.default_temperature);

    let hint = title.or_else(|| catalog.topic(id).map(|t| t.title.clone()));

    eprint!("  Descending into the archive...");
    let detail = resolver.resolve(id, hint.as_deref()).await;
    eprint!("\r                                \r");

    let Some(detail) = detail else {
        return Err(format!("Failed to retrieve \"{id}\" from the archive.").into());
    };

    print!("{}", render(&detail));

    let related = catalog.related(id, RELATED_COUNT);
    if !related.is_empty() {
        println!("  Related rabbit holes:");
        for topic in related {
            println!("    {:<24} {}", topic.id, topic.title);
        }
        println!();
    }

    Ok(())
}

fn render(detail: &TopicDetail) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n  {}\n", detail.title.to_uppercase());
    let _ = writeln!(out, "  {}\n", detail.description);
    let _ = writeln!(out, "  Why it is a black hole");
    let _ = writeln!(out, "  {}\n", detail.why_it_is_a_black_hole);

    let _ = writeln!(out, "  Key concepts");
    for concept in &detail.key_concepts {
        let _ = writeln!(out, "  • {}: {}", concept.name, concept.description);
    }
    out.push('\n');

    let _ = writeln!(out, "  Learning roadmap");
    for (i, step) in detail.learning_roadmap.iter().enumerate() {
        let _ = writeln!(out, "  {}. {}", i + 1, step);
    }
    out.push('\n');

    let _ = writeln!(out, "  Philosophical implications");
    let _ = writeln!(out, "  {}\n", detail.philosophical_implications);

    if let Some(snippet) = &detail.code_snippet {
        let _ = writeln!(out, "  Code ({})", snippet.language);
        for line in snippet.code.lines() {
            let _ = writeln!(out, "    {line}");
        }
        let _ = writeln!(out, "  {}\n", snippet.explanation);
    }

    out
}

// UI layer: everything that talks to the terminal. Commands parsed by `cli`
// are dispatched here, the work is delegated to `Publisher`, and results are
// printed to stdout. Prompts use `dialoguer`, the spinner uses `indicatif`.

use std::time::Duration;

use anyhow::{Context, Result};
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};

use crate::api::{ArticleStatus, Author, Category, CreatedArticle, Tag};
use crate::cli::{split_tags, Cli, Commands, PublishArgs};
use crate::config::{self, PublisherConfig};
use crate::content::load_content;
use crate::publisher::{ArticleRequest, Publisher};

/// Colour shown for categories that do not define one.
const DEFAULT_CATEGORY_COLOR: &str = "#3b82f6";

/// Run one parsed command to completion.
pub fn run(cli: Cli) -> Result<()> {
    let config = PublisherConfig::new(&cli.url).with_api_key(config::resolve_api_key(cli.key));

    match cli.command {
        Commands::Publish(args) => publish(config, args),
        Commands::Categories => {
            let publisher = Publisher::new(config)?;
            let categories = publisher
                .list_categories()
                .context("Failed to list categories")?;
            print_categories(&categories);
            Ok(())
        }
        Commands::Authors => {
            let publisher = Publisher::new(config)?;
            let authors = publisher.list_authors().context("Failed to list authors")?;
            print_authors(&authors);
            Ok(())
        }
        Commands::Tags => {
            let publisher = Publisher::new(config)?;
            let tags = publisher.list_tags().context("Failed to list tags")?;
            print_tags(&tags);
            Ok(())
        }
        Commands::SetKey { key } => {
            let path = config::persist_api_key(&key)?;
            println!("API key saved to {}", path.display());
            Ok(())
        }
    }
}

fn publish(config: PublisherConfig, args: PublishArgs) -> Result<()> {
    let content = load_content(&args.content).context("Failed to read content file")?;
    let config = config.with_tag_link_delay(Duration::from_millis(args.tag_delay_ms));
    let publisher = Publisher::new(config)?;

    let mut request = ArticleRequest::new(
        args.title,
        content,
        args.category,
        args.author,
        args.summary,
        args.image,
    )
    .tags(args.tags.as_deref().map(split_tags).unwrap_or_default())
    .status(if args.draft {
        ArticleStatus::Draft
    } else {
        ArticleStatus::Published
    })
    .featured(args.featured)
    .clean_html(args.clean_html);
    request.image_credit = args.image_credit;
    request.reading_time = args.reading_time;
    request.publish_date = args.publish_date;
    request.meta_title = args.meta_title;
    request.meta_description = args.meta_description;

    if !args.yes && !confirm_publish(&request, publisher.config())? {
        println!("Publishing cancelled.");
        return Ok(());
    }

    let spinner = spinner("Publishing article...");
    let result = publisher.publish(&request);
    spinner.finish_and_clear();

    let article = result.context("Failed to publish article")?;
    print_published(&article, publisher.config());
    Ok(())
}

/// Show what is about to be sent and ask the user to go ahead.
fn confirm_publish(request: &ArticleRequest, config: &PublisherConfig) -> Result<bool> {
    println!("Title:    {}", request.title);
    println!("Endpoint: {}", config.base_url);
    println!("Image:    {}", request.image_path.display());
    if !request.tags.is_empty() {
        println!("Tags:     {}", request.tags.join(", "));
    }
    let ok = Confirm::new()
        .with_prompt("Publish this article?")
        .default(false)
        .interact()?;
    Ok(ok)
}

fn spinner(msg: &'static str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(msg);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

fn print_categories(categories: &[Category]) {
    for category in categories {
        println!("- ID: {}", category.id);
        println!("  Name: {}", category.name);
        println!("  Slug: {}", category.slug);
        println!(
            "  Color: {}",
            category.color.as_deref().unwrap_or(DEFAULT_CATEGORY_COLOR)
        );
    }
}

fn print_authors(authors: &[Author]) {
    for author in authors {
        println!("- ID: {}", author.id);
        println!("  Name: {}", author.name);
        println!("  Slug: {}", author.slug);
    }
}

fn print_tags(tags: &[Tag]) {
    for tag in tags {
        println!("- {} ({}) id={}", tag.name, tag.slug, tag.id);
    }
}

fn print_published(article: &CreatedArticle, config: &PublisherConfig) {
    let slug = article.slug.as_deref().unwrap_or_default();
    println!("Article published successfully!");
    println!("ID: {}", article.id.as_deref().unwrap_or("-"));
    println!("Slug: {slug}");
    println!("URL: {}", config.article_page_url(slug));
}

use anyhow::Context;
use clap::Parser;
use std::path::Path;
use std::process::ExitCode;

use draftdesk::cli::{Args, Command, EditArgs, GenerateArgs, PickArgs, ShowArgs};
use draftdesk::config::Config;
use draftdesk::provider::{make_provider, DynProvider};
use draftdesk::publish::{self, PostStore};
use draftdesk::scrape::Scraper;
use draftdesk::server::{self, AppState};
use draftdesk::session::{Limits, Session, SessionState};
use draftdesk::{log, ux};

/// Commands that go through the model and the single-flight guard.
enum Op {
    Generate(GenerateArgs),
    Revise(String),
    Seo,
    FactCheck,
    Extract(String),
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    log::init_tracing(args.debug);
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            ux::print_error(&e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let mut cfg = Config::load(args.config.as_deref())?;
    if args.save_artifacts {
        cfg.save_artifacts = true;
    }
    let session = args.session.as_path();

    match args.command {
        Command::Generate(g) => online(&cfg, session, Op::Generate(g)).await,
        Command::Revise { instructions } => online(&cfg, session, Op::Revise(instructions)).await,
        Command::Seo => online(&cfg, session, Op::Seo).await,
        Command::FactCheck => online(&cfg, session, Op::FactCheck).await,
        Command::Extract { url } => online(&cfg, session, Op::Extract(url)).await,
        Command::Score => offline(session, |s| {
            ux::print_score(s.score_similarity());
            Ok(())
        }),
        Command::Show(show) => offline(session, |s| show_session(s, &show)),
        Command::Edit(edit) => offline(session, |s| edit_output(s, &edit)),
        Command::Clear => offline(session, |s| {
            s.clear();
            println!("session cleared");
            Ok(())
        }),
        Command::River(pick) => river(&cfg, pick).await,
        Command::Wiki(pick) => wiki(&cfg, pick).await,
        Command::Serve { port } => {
            if let Some(port) = port {
                cfg.port = port;
            }
            let provider = provider_for(&cfg)?;
            server::serve(AppState::new(cfg, provider)?).await
        }
    }
}

fn provider_for(cfg: &Config) -> anyhow::Result<DynProvider> {
    Ok(log::with_artifacts(make_provider(cfg)?, cfg))
}

fn offline(path: &Path, f: impl FnOnce(&mut SessionState) -> anyhow::Result<()>) -> anyhow::Result<()> {
    let mut state = SessionState::load(path)?;
    f(&mut state)?;
    state.save(path).with_context(|| format!("saving session {}", path.display()))
}

async fn online(cfg: &Config, path: &Path, op: Op) -> anyhow::Result<()> {
    let mut state = SessionState::load(path)?;
    match &op {
        Op::Generate(g) => g.apply_to(&mut state)?,
        Op::Revise(instructions) => state.set_revision_instructions(instructions.as_str()),
        Op::Seo | Op::FactCheck | Op::Extract(_) => {}
    }

    let limits = Limits { max_output_tokens: cfg.max_output_tokens, light_output_tokens: cfg.light_output_tokens };
    let session = Session::new(state, provider_for(cfg)?, limits);
    let outcome = run_op(&session, op).await;
    // a failed call leaves the state as it was; flag changes still stick
    session
        .into_state()
        .save(path)
        .with_context(|| format!("saving session {}", path.display()))?;
    outcome
}

async fn run_op(session: &Session, op: Op) -> anyhow::Result<()> {
    match op {
        Op::Generate(_) => {
            let result = session.generate().await?;
            ux::print_result(&result, session.snapshot().show_changes_report);
        }
        Op::Revise(_) => ux::print_result(&session.revise().await?, false),
        Op::Seo => ux::print_result(&session.enrich_seo().await?, false),
        Op::FactCheck => {
            let outcome = session.fact_check().await?;
            ux::print_fact_checks(outcome.records());
            if outcome.dropped_segments > 0 {
                println!("({} block(s) could not be parsed)", outcome.dropped_segments);
            }
        }
        Op::Extract(url) => ux::print_source(&session.extract_source(&url).await?),
    }
    Ok(())
}

fn show_session(state: &mut SessionState, show: &ShowArgs) -> anyhow::Result<()> {
    if show.changes {
        state.toggle_changes_report();
    }
    if show.facts {
        state.toggle_fact_check();
    }
    ux::print_state(state, show.raw);
    Ok(())
}

fn edit_output(state: &mut SessionState, edit: &EditArgs) -> anyhow::Result<()> {
    if edit.cancel {
        state.cancel_edit();
        println!("edit cancelled");
        return Ok(());
    }
    let html = match (&edit.file, &edit.html) {
        (Some(path), _) => Some(fs_err::read_to_string(path)?),
        (None, Some(html)) => Some(html.clone()),
        (None, None) => None,
    };
    match html {
        Some(html) => {
            state.commit_edit(html)?;
            println!("output updated ({} words)", state.output_word_count());
        }
        None => {
            state.start_editing();
            println!("{}", state.editing_html);
        }
    }
    Ok(())
}

fn pick<T>(items: &[T], n: usize) -> anyhow::Result<&T> {
    n.checked_sub(1)
        .and_then(|i| items.get(i))
        .with_context(|| format!("no entry {n}; {} listed", items.len()))
}

async fn river(cfg: &Config, args: PickArgs) -> anyhow::Result<()> {
    let scraper = Scraper::new(cfg)?;
    let (url, title) = match (args.url, args.draft) {
        (Some(url), _) => (url, None),
        (None, Some(n)) => {
            let links = scraper.fetch_river().await?;
            let link = pick(&links, n)?;
            (link.url.clone(), Some(link.title.clone()))
        }
        (None, None) => {
            ux::print_river(&scraper.fetch_river().await?);
            return Ok(());
        }
    };
    let article = scraper.fetch_article(&url).await?;
    let context = publish::river_context(title.as_deref().unwrap_or(&article.title));
    draft_and_save(cfg, &article.content, &url, &context, args.slug).await
}

async fn wiki(cfg: &Config, args: PickArgs) -> anyhow::Result<()> {
    let scraper = Scraper::new(cfg)?;
    let url = match (args.url, args.draft) {
        (Some(url), _) => url,
        (None, Some(n)) => pick(&scraper.fetch_unusual_articles().await?, n)?.url.clone(),
        (None, None) => {
            ux::print_wiki(&scraper.fetch_unusual_articles().await?);
            return Ok(());
        }
    };
    let article = scraper.fetch_wiki_article(&url).await?;
    let context = publish::wiki_context(&article.title, &article.description);
    draft_and_save(cfg, &article.content, &url, &context, args.slug).await
}

async fn draft_and_save(
    cfg: &Config,
    article: &str,
    url: &str,
    context: &str,
    slug: Option<String>,
) -> anyhow::Result<()> {
    let provider = provider_for(cfg)?;
    let post =
        publish::draft_post(provider.as_ref(), cfg.model, cfg.light_output_tokens, article, url, context).await?;
    let slug = slug.unwrap_or_else(|| post.headline.clone());
    let saved = PostStore::new(cfg.posts_root.clone()).save(&post, &slug)?;
    ux::print_post(&post, &saved);
    Ok(())
}

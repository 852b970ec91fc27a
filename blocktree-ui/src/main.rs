//! Headless driver for the editor core.
//!
//! Reads a line-oriented script from stdin and prints every emitted event as
//! a JSON line. Time only moves on `tick`, so scripts are reproducible.
//!
//! ```text
//! enter w*b2        pointer enters the element with that DOM id
//! leave w*b2 w*b3   pointer leaves, optionally into another element
//! key ctrl+x        key press
//! click
//! button copyBlock
//! tick 50           advance the clock and fire due transitions
//! showed b1         the renderer finished drawing
//! level 0           choose a breadcrumb entry
//! tree main         switch to a tree by id
//! hotkeys {"cutBlock": "ctrl+shift+x"}
//! popup / submit / cancel
//! state             print mode and armed command
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context as _};
use blocktree_api::{Block, BlockId, HotkeyMap, TreeId};
use blocktree_kernel::{KvStore, MemoryStore, Navigator, SqliteStore};
use blocktree_ui::clock::ManualClock;
use blocktree_ui::keymap::KeyCombo;
use blocktree_ui::popup::NoopPopup;
use blocktree_ui::surface::{NodeArena, NodeId, Surface};
use blocktree_ui::config::StoreLocation;
use blocktree_ui::{Session, SessionConfig};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries events
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = SessionConfig::from_env()?;
    tracing::info!(?config, "Starting blocktree");

    match config.store_location() {
        StoreLocation::Memory => run(MemoryStore::new(), config).await,
        StoreLocation::Path(path) => {
            let store = SqliteStore::open(&path)
                .with_context(|| format!("opening {}", path.display()))?;
            run(store, config).await
        }
        StoreLocation::Default => {
            let store = SqliteStore::open_default().context("opening default store")?;
            run(store, config).await
        }
    }
}

async fn run<S: KvStore + 'static>(store: S, config: SessionConfig) -> anyhow::Result<()> {
    let navigator = Arc::new(Navigator::new(store));
    seed(&navigator).await?;

    let clock = ManualClock::new();
    let mut session =
        Session::load(&config, navigator, demo_surface(), Box::new(clock.clone())).await?;
    let mut events = session.subscribe();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line == "quit" {
            break;
        }

        if let Err(error) = step(&mut session, &clock, line).await {
            tracing::warn!(%error, line, "script step failed");
        }
        while let Ok(event) = events.try_recv() {
            println!("{}", serde_json::to_string(&event)?);
        }
    }
    Ok(())
}

async fn step<S: KvStore>(
    session: &mut Session<S, NodeArena>,
    clock: &ManualClock,
    line: &str,
) -> anyhow::Result<()> {
    let (verb, rest) = line
        .split_once(' ')
        .map_or((line, ""), |(verb, rest)| (verb, rest.trim()));

    match verb {
        "key" => {
            let combo: KeyCombo = rest.parse()?;
            let outcome = session.handle_key(combo).await?;
            tracing::debug!(%combo, ?outcome, "key");
        }
        "click" => {
            session.handle_click().await?;
        }
        "button" => {
            session.press_button(rest).await?;
        }
        "enter" => {
            let node = lookup(session.surface(), rest)?;
            session.pointer_enter(node);
        }
        "leave" => {
            let mut parts = rest.split_whitespace();
            let node = lookup(session.surface(), parts.next().unwrap_or_default())?;
            let related = parts
                .next()
                .map(|id| lookup(session.surface(), id))
                .transpose()?;
            session.pointer_leave(node, related);
        }
        "tick" => {
            let ms: u64 = rest.parse().context("tick takes milliseconds")?;
            clock.advance(Duration::from_millis(ms));
            session.tick();
        }
        "showed" => {
            let active = (!rest.is_empty()).then(|| BlockId::new(rest));
            session.showed_blocks(active);
        }
        "level" => {
            let level: usize = rest.parse().context("level takes a path index")?;
            session.navigate_to_level(level).await?;
        }
        "tree" => session.switch_tree(TreeId::new(rest)).await?,
        "hotkeys" => {
            let map: HotkeyMap = serde_json::from_str(rest)?;
            session.re_register(map).await?;
        }
        "popup" => session.open_popup(Box::new(NoopPopup)),
        "submit" => session.submit_popup(),
        "cancel" => session.close_popups(),
        "state" => {
            let ctx = session.context();
            let state = serde_json::json!({
                "mode": ctx.mode().to_string(),
                "command": ctx.cmd_id.as_str(),
                "pending": session.pending_transition().map(|p| p.due().as_millis() as u64),
            });
            println!("{state}");
        }
        other => bail!("unknown script command: {other}"),
    }
    Ok(())
}

fn lookup(surface: &NodeArena, dom_id: &str) -> anyhow::Result<NodeId> {
    surface
        .find_by_dom_id(dom_id)
        .ok_or_else(|| anyhow!("no element with id {dom_id:?}"))
}

/// root
/// └── b1
///     ├── b2
///     │   └── b4
///     ├── b3
///     └── link*l1 -> b4
///         └── b4
fn demo_surface() -> NodeArena {
    let mut arena = NodeArena::new();
    let root = arena.root();
    let b1 = arena.add_block(root, "w*b1");
    let b2 = arena.add_block(b1, "w*b2");
    arena.add_block(b2, "w*b4");
    arena.add_block(b1, "w*b3");
    let link = arena.add_link(b1, "link*l1", "b4");
    arena.add_block(link, "lw*b4");
    arena
}

/// Cache the demo blocks and open the demo tree, unless a tree is already current.
async fn seed<S: KvStore>(navigator: &Navigator<S>) -> anyhow::Result<()> {
    if navigator.current_tree().await?.is_some() {
        return Ok(());
    }

    let root = Block {
        children: vec![BlockId::new("b2"), BlockId::new("b3"), BlockId::new("l1")],
        ..Block::new("b1", "Home")
    };
    let blocks = [
        Block::new("b2", "Projects").with_parent("b1"),
        Block::new("b3", "Reading list").with_parent("b1"),
        Block::new("b4", "Blocktree").with_parent("b2"),
    ];
    navigator.cache_block(&root, None).await?;
    for block in &blocks {
        navigator.cache_block(block, None).await?;
    }

    let tree = TreeId::new("main");
    navigator.add_tree_id(&tree).await?;
    navigator.set_current_tree(&tree).await?;
    navigator.init_tree_path(&tree, &root).await?;
    tracing::info!(%tree, "seeded demo tree");
    Ok(())
}

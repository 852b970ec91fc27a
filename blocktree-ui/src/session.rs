//! Editor session - the single owner of the context.
//!
//! A [`Session`] ties together the context, the rendered surface, the command
//! registry, the dispatcher and the navigator. Outbound intents go to every
//! subscriber of a broadcast channel. [`spawn`] runs a session in its own
//! task, so inputs from any source are applied one at a time.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use blocktree_api::{BlockId, EditorEvent, HotkeyMap, TreeId};
use blocktree_kernel::{KvStore, NavError, NavOutcome, Navigator};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::clock::Clock;
use crate::commands::{builtin, CommandContext, CommandRegistry, Effect, NavIntent, RegistryError};
use crate::config::{ConfigError, SessionConfig};
use crate::context::{Context, InputEvent};
use crate::dispatch::{Dispatch, Dispatcher, PendingTransition};
use crate::keymap::{KeyCombo, Trigger};
use crate::popup::Popup;
use crate::surface::{NodeId, Surface};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Nav(#[from] NavError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("session closed")]
    Closed,
}

/// What happened to a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Bound and dispatched; the input layer should suppress the default action.
    Handled,
    /// Bound, but dropped as key repeat.
    Throttled,
    Unbound,
}

/// How a dispatch of the armed command ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatched {
    Unknown,
    Executed,
    Deferred,
}

/// Messages accepted by a spawned session.
pub enum SessionInput {
    Key(KeyCombo),
    Click,
    Button(String),
    PointerEnter(NodeId),
    PointerLeave {
        node: NodeId,
        related: Option<NodeId>,
    },
    /// The renderer finished drawing the current screen.
    ShowedBlocks {
        active_id: Option<BlockId>,
    },
    /// Replace the user's hotkey overrides.
    ReRegistrationCmd {
        hotkeys: HotkeyMap,
    },
    OpenPopup(Box<dyn Popup>),
    SubmitPopup,
    ClosePopups,
    /// A breadcrumb entry was chosen; `0` is the tree root.
    NavigateToLevel(usize),
    SwitchTree(TreeId),
}

pub struct Session<S, U> {
    ctx: Context,
    surface: U,
    registry: CommandRegistry,
    dispatcher: Dispatcher,
    navigator: Arc<Navigator<S>>,
    clock: Box<dyn Clock>,
    events: broadcast::Sender<EditorEvent>,
    tick_interval: Duration,
}

impl<S: KvStore, U: Surface> Session<S, U> {
    /// Build a session, binding the current user's saved hotkeys.
    pub async fn load(
        config: &SessionConfig,
        navigator: Arc<Navigator<S>>,
        surface: U,
        clock: Box<dyn Clock>,
    ) -> Result<Self, SessionError> {
        let hotkeys = navigator.hotkey_map(None).await?;
        let registry = CommandRegistry::with_throttle(
            builtin::definitions,
            hotkeys,
            config.view,
            config.throttle(),
        )?;
        let default_cmd = registry
            .get(&config.default_command)
            .map(|command| command.id)
            .ok_or_else(|| ConfigError::UnknownDefaultCommand(config.default_command.clone()))?;

        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        tracing::info!(
            view = ?config.view,
            commands = registry.all().len(),
            "session loaded"
        );

        Ok(Self {
            ctx: Context::with_default_command(default_cmd),
            surface,
            registry,
            dispatcher: Dispatcher::with_fallback_delay(config.fallback_delay()),
            navigator,
            clock,
            events,
            tick_interval: config.tick_interval(),
        })
    }

    /// Subscribe to outbound events.
    pub fn subscribe(&self) -> broadcast::Receiver<EditorEvent> {
        self.events.subscribe()
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn surface(&self) -> &U {
        &self.surface
    }

    /// Mutable access for the renderer, e.g. to redraw nodes.
    pub fn surface_mut(&mut self) -> &mut U {
        &mut self.surface
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn navigator(&self) -> &Arc<Navigator<S>> {
        &self.navigator
    }

    pub fn pending_transition(&self) -> Option<PendingTransition> {
        self.dispatcher.pending()
    }

    fn emit(&self, event: EditorEvent) {
        tracing::trace!(?event, "emit");
        // No subscribers is fine; intents are fire-and-forget.
        let _ = self.events.send(event);
    }

    // =========================================================================
    // Inputs
    // =========================================================================

    pub async fn handle(&mut self, input: SessionInput) -> Result<(), SessionError> {
        match input {
            SessionInput::Key(combo) => {
                self.handle_key(combo).await?;
            }
            SessionInput::Click => {
                self.handle_click().await?;
            }
            SessionInput::Button(id) => {
                self.press_button(&id).await?;
            }
            SessionInput::PointerEnter(node) => self.pointer_enter(node),
            SessionInput::PointerLeave { node, related } => self.pointer_leave(node, related),
            SessionInput::ShowedBlocks { active_id } => {
                self.showed_blocks(active_id);
            }
            SessionInput::ReRegistrationCmd { hotkeys } => self.re_register(hotkeys).await?,
            SessionInput::OpenPopup(popup) => self.open_popup(popup),
            SessionInput::SubmitPopup => self.submit_popup(),
            SessionInput::ClosePopups => self.close_popups(),
            SessionInput::NavigateToLevel(level) => self.navigate_to_level(level).await?,
            SessionInput::SwitchTree(tree) => self.switch_tree(tree).await?,
        }
        Ok(())
    }

    pub async fn handle_key(&mut self, combo: KeyCombo) -> Result<KeyOutcome, SessionError> {
        let now = self.clock.now();
        let id = match self.registry.binder_mut().trigger(&combo, now) {
            Trigger::Fire(id) => id,
            Trigger::Throttled(id) => {
                tracing::trace!(%combo, command = %id, "key repeat throttled");
                return Ok(KeyOutcome::Throttled);
            }
            Trigger::Unbound => return Ok(KeyOutcome::Unbound),
        };

        self.ctx.last_input = Some(InputEvent::Key(combo));
        self.ctx.set_cmd(id);
        self.dispatch_armed().await?;
        Ok(KeyOutcome::Handled)
    }

    /// A click runs whatever command is armed.
    pub async fn handle_click(&mut self) -> Result<Dispatched, SessionError> {
        self.ctx.last_input = Some(InputEvent::Click);
        self.dispatch_armed().await
    }

    pub async fn press_button(&mut self, id: &str) -> Result<Dispatched, SessionError> {
        let effect = match self.registry.get(id) {
            Some(command) => {
                self.ctx.last_input = Some(InputEvent::Button(command.id));
                self.ctx.set_cmd_command(command, &mut self.surface)
            }
            None => {
                tracing::debug!(command = id, "ignoring unknown button");
                return Ok(Dispatched::Unknown);
            }
        };
        self.apply(effect).await?;
        self.dispatch_armed().await
    }

    /// Truncate the breadcrumb path so `level` is the current screen.
    pub async fn navigate_to_level(&mut self, level: usize) -> Result<(), SessionError> {
        self.navigate(NavIntent::ToLevel(level)).await
    }

    pub async fn switch_tree(&mut self, tree: TreeId) -> Result<(), SessionError> {
        self.navigate(NavIntent::SwitchTree(tree)).await
    }

    pub fn pointer_enter(&mut self, node: NodeId) {
        self.ctx.pointer_enter(&mut self.surface, node);
    }

    pub fn pointer_leave(&mut self, node: NodeId, related: Option<NodeId>) {
        self.ctx.pointer_leave(&mut self.surface, node, related);
    }

    pub fn showed_blocks(&mut self, active_id: Option<BlockId>) -> Option<NodeId> {
        self.ctx.on_showed_blocks(&mut self.surface, active_id)
    }

    pub fn open_popup(&mut self, popup: Box<dyn Popup>) {
        self.ctx.open_popup(&mut self.surface, popup);
    }

    pub fn submit_popup(&mut self) {
        self.ctx.submit_popup(&mut self.surface);
    }

    pub fn close_popups(&mut self) {
        self.ctx.close_popups(&mut self.surface);
    }

    /// Rebind every hotkey from `hotkeys` and persist them.
    ///
    /// An invalid map leaves the bindings as they were and is reported as a
    /// notice.
    pub async fn re_register(&mut self, hotkeys: HotkeyMap) -> Result<(), SessionError> {
        match self.registry.reset_and_re_register(hotkeys.clone()) {
            Ok(buttons) => {
                self.navigator.save_hotkey_map(&hotkeys, None).await?;
                self.emit(EditorEvent::ButtonsChanged { buttons });
                Ok(())
            }
            Err(error) => {
                tracing::warn!(%error, "hotkey map rejected");
                self.emit(EditorEvent::Notice {
                    message: error.to_string(),
                });
                Err(error.into())
            }
        }
    }

    /// Fire due transitions. Returns true if one fired.
    pub fn tick(&mut self) -> bool {
        let now = self.clock.now();
        self.dispatcher.tick(now, &mut self.ctx, &mut self.surface)
    }

    async fn dispatch_armed(&mut self) -> Result<Dispatched, SessionError> {
        let now = self.clock.now();
        let id = self.ctx.cmd_id;
        let outcome = {
            let mut cx = CommandContext {
                ctx: &mut self.ctx,
                surface: &mut self.surface,
            };
            self.dispatcher.dispatch(&self.registry, id.as_str(), &mut cx, now)
        };
        match outcome {
            Dispatch::Unknown => Ok(Dispatched::Unknown),
            Dispatch::Deferred => Ok(Dispatched::Deferred),
            Dispatch::Executed(effect) => {
                self.apply(effect).await?;
                Ok(Dispatched::Executed)
            }
        }
    }

    // =========================================================================
    // Effects
    // =========================================================================

    /// Apply a command's effect, in order.
    pub async fn apply(&mut self, effect: Effect) -> Result<(), SessionError> {
        let mut queue = VecDeque::from([effect]);
        while let Some(effect) = queue.pop_front() {
            match effect {
                Effect::None => {}
                Effect::Emit(event) => self.emit(event),
                Effect::Notice(message) => self.emit(EditorEvent::Notice { message }),
                Effect::Popup { kind, block_id } => {
                    self.emit(EditorEvent::OpenPopup { kind, block_id })
                }
                Effect::Navigate(intent) => self.navigate(intent).await?,
                Effect::Batch(effects) => {
                    for effect in effects.into_iter().rev() {
                        queue.push_front(effect);
                    }
                }
            }
        }
        Ok(())
    }

    /// Run a navigation; rejections become notices, store failures are errors.
    async fn navigate(&mut self, intent: NavIntent) -> Result<(), SessionError> {
        match self.run_navigation(intent).await {
            Ok(focus) => self.publish_path(focus).await,
            Err(error) if error.is_rejection() => {
                tracing::info!(%error, "navigation rejected");
                self.emit(EditorEvent::Notice {
                    message: error.to_string(),
                });
                Ok(())
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Returns the block to re-focus, if the path was popped.
    async fn run_navigation(&mut self, intent: NavIntent) -> Result<Option<BlockId>, NavError> {
        let navigator = Arc::clone(&self.navigator);
        match intent {
            NavIntent::Into {
                block_id,
                parent_hsl,
                links,
            } => match navigator.navigate_into(&block_id, parent_hsl, links).await? {
                NavOutcome::Pushed(_) => Ok(None),
                NavOutcome::Back { active_id } => Ok(Some(active_id)),
            },
            NavIntent::Back => navigator.navigate_back().await.map(Some),
            NavIntent::ToLevel(level) => navigator.navigate_to_level(level).await.map(|_| None),
            NavIntent::SwitchTree(tree) => {
                let tree_id = navigator.switch_tree(&tree).await?;
                self.emit(EditorEvent::TreeSwitched { tree_id });
                Ok(None)
            }
            NavIntent::SwitchTreeByIndex(index) => {
                let tree_id = navigator.switch_tree_by_index(index).await?;
                self.emit(EditorEvent::TreeSwitched { tree_id });
                Ok(None)
            }
        }
    }

    /// Tell the renderer to show the current screen of the current path.
    async fn publish_path(&mut self, focus: Option<BlockId>) -> Result<(), SessionError> {
        let navigator = Arc::clone(&self.navigator);
        let Some(tree_id) = navigator.current_tree().await? else {
            return Ok(());
        };
        let path = navigator.path(Some(&tree_id), None).await?;

        if let Some(current) = path.last() {
            self.emit(EditorEvent::OpenBlock {
                id: current.block_id.clone(),
                parent_hsl: current.color,
                is_iframe: false,
                links: current.links.clone(),
            });
        }
        self.ctx.pending_focus = focus.clone();
        self.emit(EditorEvent::PathChanged {
            tree_id,
            path,
            focus,
        });
        Ok(())
    }
}

/// Handle to a session running in its own task.
pub struct SessionHandle {
    input: mpsc::Sender<SessionInput>,
    events: broadcast::Sender<EditorEvent>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    pub async fn send(&self, input: SessionInput) -> Result<(), SessionError> {
        self.input.send(input).await.map_err(|_| SessionError::Closed)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EditorEvent> {
        self.events.subscribe()
    }

    /// Close the input channel and wait for the task to drain it.
    pub async fn shutdown(self) {
        drop(self.input);
        if let Err(error) = self.task.await {
            tracing::error!(%error, "session task failed");
        }
    }
}

/// Run `session` in a task fed by a channel, firing due transitions on a
/// fixed tick.
pub fn spawn<S, U>(mut session: Session<S, U>) -> SessionHandle
where
    S: KvStore + 'static,
    U: Surface + Send + 'static,
{
    let (input, mut inputs) = mpsc::channel(64);
    let events = session.events.clone();
    let tick_interval = session.tick_interval;

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                next = inputs.recv() => match next {
                    Some(input) => {
                        if let Err(error) = session.handle(input).await {
                            tracing::warn!(%error, "session input failed");
                        }
                    }
                    None => break,
                },
                _ = ticker.tick() => {
                    session.tick();
                }
            }
        }
        tracing::debug!("session task stopped");
    });

    SessionHandle {
        input,
        events,
        task,
    }
}

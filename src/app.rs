use crate::{
    client::RemoteDataClient,
    config::AppConfig,
    console::{
        BetConsole,
        Command,
        ConsolePhase,
        ConsoleView,
        MutationOutcome,
    },
    error::ClientError,
    graphql::{
        HttpTransport,
        Transport,
    },
    toast::{
        Notifier,
        ToastQueue,
    },
    ui,
};
use color_eyre::eyre::{
    Result,
    WrapErr,
};
use std::{
    sync::Arc,
    time::{
        Duration,
        Instant,
    },
};
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time,
};
use tracing::{
    debug,
    info,
    warn,
};

const UI_TICK: Duration = Duration::from_millis(250);

/// Completion report from a spawned network task, tagged with the sequence
/// number it was dispatched under.
#[derive(Debug)]
pub struct AppEvent {
    seq: u64,
    kind: AppEventKind,
}

#[derive(Debug)]
enum AppEventKind {
    MutationSettled(Result<MutationOutcome, ClientError>),
    Refetched(Result<(), ClientError>),
}

/// Decoded key press, before it is mapped onto the console.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Input {
    Char(char),
    Backspace,
    FocusNext,
    FocusPrev,
    Enter,
    Cancel,
    Redraw,
    Quit,
}

/// Owns the console, the notifier and at most one in-flight network task.
pub struct Session<T: Transport, N: Notifier> {
    client: Arc<RemoteDataClient<T>>,
    console: BetConsole,
    notifier: N,
    events: mpsc::UnboundedSender<AppEvent>,
    seq: u64,
    in_flight: Option<JoinHandle<()>>,
}

impl<T: Transport, N: Notifier> Session<T, N> {
    pub fn new(
        client: Arc<RemoteDataClient<T>>,
        notifier: N,
    ) -> (Self, mpsc::UnboundedReceiver<AppEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        let session = Self {
            client,
            console: BetConsole::new(),
            notifier,
            events,
            seq: 0,
            in_flight: None,
        };
        (session, events_rx)
    }

    pub fn client(&self) -> &Arc<RemoteDataClient<T>> {
        &self.client
    }

    pub fn console(&self) -> &BetConsole {
        &self.console
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn notifier_mut(&mut self) -> &mut N {
        &mut self.notifier
    }

    pub fn view(&self) -> ConsoleView {
        self.console.view(self.client.user(), self.client.bets())
    }

    pub fn start(&mut self) {
        let command = self.console.start();
        self.dispatch(command);
    }

    /// Applies one key press. Returns false when the user asked to quit.
    pub fn apply_input(&mut self, input: Input) -> bool {
        let user = self.client.user().data;
        let command = match input {
            Input::Quit => return false,
            Input::Redraw => None,
            Input::Cancel => {
                let command = self.console.cancel(&mut self.notifier);
                if command.is_some() {
                    self.abort_in_flight();
                }
                command
            }
            _ if !matches!(
                self.console.phase(),
                ConsolePhase::Ready | ConsolePhase::Submitting(_)
            ) =>
            {
                match input {
                    Input::Char('q') => return false,
                    Input::Char('r') => self.console.reload(),
                    _ => None,
                }
            }
            Input::FocusNext => {
                self.console.focus_next();
                None
            }
            Input::FocusPrev => {
                self.console.focus_prev();
                None
            }
            Input::Backspace => {
                self.console.backspace();
                None
            }
            Input::Enter => self.console.activate(user.as_ref()),
            Input::Char(c) if self.console.focus().is_input() => {
                self.console.input_char(c);
                None
            }
            Input::Char(c) => match c {
                'q' => return false,
                's' => self.console.submit_bet(),
                'w' => self.console.withdraw(user.as_ref()),
                'h' => {
                    self.console.toggle_history();
                    None
                }
                _ => None,
            },
        };
        if let Some(command) = command {
            self.dispatch(command);
        }
        true
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        if event.seq != self.seq {
            debug!(seq = event.seq, current = self.seq, "dropping stale task result");
            return;
        }
        self.in_flight = None;
        match event.kind {
            AppEventKind::MutationSettled(result) => {
                if let Some(command) =
                    self.console.on_mutation_settled(result, &mut self.notifier)
                {
                    self.dispatch(command);
                }
            }
            AppEventKind::Refetched(result) => {
                let user = self.client.user();
                self.console.on_refetched(result, &user, &mut self.notifier);
            }
        }
    }

    fn dispatch(&mut self, command: Command) {
        self.abort_in_flight();
        self.seq += 1;
        let seq = self.seq;
        let client = Arc::clone(&self.client);
        let events = self.events.clone();
        info!(seq, ?command, "dispatching");
        let handle = tokio::spawn(async move {
            let kind = match command {
                Command::Load | Command::RefetchAll => {
                    AppEventKind::Refetched(client.refetch_all().await)
                }
                Command::PlaceBet(variables) => AppEventKind::MutationSettled(
                    client
                        .place_bet(variables)
                        .await
                        .map(MutationOutcome::BetPlaced),
                ),
                Command::Withdraw => AppEventKind::MutationSettled(
                    client.withdraw().await.map(MutationOutcome::Withdrawn),
                ),
            };
            if events.send(AppEvent { seq, kind }).is_err() {
                warn!(seq, "event receiver dropped before task finished");
            }
        });
        self.in_flight = Some(handle);
    }

    fn abort_in_flight(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
    }

    /// Processes task results until nothing is in flight.
    #[cfg(test)]
    pub async fn settle(&mut self, events: &mut mpsc::UnboundedReceiver<AppEvent>) {
        while self.in_flight.is_some() {
            let Some(event) = events.recv().await else {
                break;
            };
            self.handle_event(event);
        }
    }
}

impl<T: Transport, N: Notifier> Drop for Session<T, N> {
    fn drop(&mut self) {
        self.abort_in_flight();
    }
}

pub async fn run_app(config: AppConfig) -> Result<()> {
    let transport = HttpTransport::new(config.endpoint.clone(), config.auth_token.clone())
        .wrap_err("failed to build GraphQL transport")?;
    info!(endpoint = %transport, "connecting to graphql endpoint");
    let client = Arc::new(RemoteDataClient::new(transport, config.request_timeout));
    let (session, events) = Session::new(client, ToastQueue::new(config.toast_ttl));
    let mut ui_state = ui::UiState::default();

    ui::terminal_enter(&mut ui_state)?;
    info!("UI ready");
    let res = run_loop(session, events, &mut ui_state).await;
    ui::terminal_exit()?;
    res
}

async fn run_loop(
    mut session: Session<HttpTransport, ToastQueue>,
    mut events: mpsc::UnboundedReceiver<AppEvent>,
    ui_state: &mut ui::UiState,
) -> Result<()> {
    let mut revision = session.client().subscribe();
    let mut input_events = ui::input_event_stream();
    let mut ticker = time::interval(UI_TICK);

    session.start();
    ui::draw(ui_state, &session.view(), session.notifier())
        .wrap_err("initial draw failed")?;

    loop {
        tokio::select! {
            maybe_event = events.recv() => {
                let Some(event) = maybe_event else {
                    warn!("event channel closed");
                    break;
                };
                session.handle_event(event);
            }
            changed = revision.changed() => {
                // cache changes only redraw; phase changes come from task results
                if changed.is_err() {
                    warn!("query cache dropped");
                    break;
                }
            }
            _ = ticker.tick() => {
                if !session.notifier_mut().prune(Instant::now()) {
                    continue;
                }
            }
            raw_ev = ui::next_raw_event(&mut input_events) => {
                let event = raw_ev?;
                let Some(input) = ui::interpret_event(event) else {
                    continue;
                };
                if !session.apply_input(input) {
                    info!("quit requested");
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                break;
            }
        }
        ui::draw(ui_state, &session.view(), session.notifier())
            .wrap_err("redraw failed")?;
    }
    Ok(())
}

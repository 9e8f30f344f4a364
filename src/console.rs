//! The bet console: phase machine, form state and control gating.
//!
//! Nothing here touches the network. Each user action returns the
//! [`Command`] the event loop should run, and results come back through
//! [`BetConsole::on_mutation_settled`] and [`BetConsole::on_refetched`].

use crate::{
    client::QueryState,
    error::ClientError,
    graphql::operations::BetVariables,
    model::{
        Bet,
        PlacedBet,
        User,
        WithdrawReceipt,
    },
    toast::{
        Notifier,
        ToastKind,
    },
};
use tracing::{
    debug,
    info,
};

const WITHDRAW_FALLBACK_MESSAGE: &str = "Withdrawal complete";
const CANCELLED_MESSAGE: &str = "Request cancelled";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MutationKind {
    PlaceBet,
    Withdraw,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConsolePhase {
    Initializing,
    Ready,
    Submitting(MutationKind),
    Error(String),
}

/// Network work requested by the console.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Load,
    PlaceBet(BetVariables),
    Withdraw,
    RefetchAll,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MutationOutcome {
    BetPlaced(PlacedBet),
    Withdrawn(WithdrawReceipt),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Focus {
    #[default]
    Amount,
    DiceNumber,
    SubmitBet,
    Withdraw,
    History,
}

impl Focus {
    const ORDER: [Focus; 5] = [
        Focus::Amount,
        Focus::DiceNumber,
        Focus::SubmitBet,
        Focus::Withdraw,
        Focus::History,
    ];

    pub fn next(self) -> Self {
        let idx = self.index();
        Self::ORDER[(idx + 1) % Self::ORDER.len()]
    }

    pub fn prev(self) -> Self {
        let idx = self.index();
        Self::ORDER[(idx + Self::ORDER.len() - 1) % Self::ORDER.len()]
    }

    pub fn is_input(self) -> bool {
        matches!(self, Focus::Amount | Focus::DiceNumber)
    }

    fn index(self) -> usize {
        Self::ORDER.iter().position(|f| *f == self).unwrap_or(0)
    }
}

/// Raw text of the bet inputs, exactly as typed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BetForm {
    pub amount: String,
    pub dice_number: String,
}

impl Default for BetForm {
    fn default() -> Self {
        Self {
            amount: String::from("0"),
            dice_number: String::from("1"),
        }
    }
}

impl BetForm {
    pub fn variables(&self) -> BetVariables {
        BetVariables {
            amount: parse_int_prefix(&self.amount),
            dice_number: parse_int_prefix(&self.dice_number),
        }
    }
}

/// Parses the leading integer of `raw` with `parseInt`-style prefix rules:
/// leading whitespace, an optional sign, then as many decimal digits as
/// follow. Anything without such a prefix is `None`, and so is a prefix
/// that overflows `i64`; out-of-range values count as non-numeric.
pub fn parse_int_prefix(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 {
        return None;
    }
    let magnitude: i64 = rest[..digits_len].parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

/// Enabled state of the console's buttons.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Controls {
    pub submit_enabled: bool,
    pub withdraw_enabled: bool,
}

/// Everything the renderer needs for one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct ConsoleView {
    pub phase: ConsolePhase,
    pub form: BetForm,
    pub focus: Focus,
    pub show_history: bool,
    pub controls: Controls,
    pub user: QueryState<User>,
    pub bets: QueryState<Vec<Bet>>,
}

#[derive(Debug)]
pub struct BetConsole {
    phase: ConsolePhase,
    form: BetForm,
    focus: Focus,
    show_history: bool,
    // mutation already settled; only its refetch is outstanding
    refetch_pending: bool,
}

impl Default for BetConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl BetConsole {
    pub fn new() -> Self {
        Self {
            phase: ConsolePhase::Initializing,
            form: BetForm::default(),
            focus: Focus::default(),
            show_history: false,
            refetch_pending: false,
        }
    }

    pub fn phase(&self) -> &ConsolePhase {
        &self.phase
    }

    pub fn form(&self) -> &BetForm {
        &self.form
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn show_history(&self) -> bool {
        self.show_history
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.phase, ConsolePhase::Submitting(_))
    }

    /// Withdraw needs at least one winning bet in the cached user and no
    /// mutation in flight.
    pub fn controls(&self, user: Option<&User>) -> Controls {
        let ready = self.phase == ConsolePhase::Ready;
        Controls {
            submit_enabled: ready,
            withdraw_enabled: ready && user.is_some_and(User::has_winning_bet),
        }
    }

    pub fn view(&self, user: QueryState<User>, bets: QueryState<Vec<Bet>>) -> ConsoleView {
        ConsoleView {
            phase: self.phase.clone(),
            form: self.form.clone(),
            focus: self.focus,
            show_history: self.show_history,
            controls: self.controls(user.data.as_ref()),
            user,
            bets,
        }
    }

    pub fn start(&mut self) -> Command {
        self.phase = ConsolePhase::Initializing;
        self.refetch_pending = false;
        Command::Load
    }

    /// Manual reload, only offered from the error screen.
    pub fn reload(&mut self) -> Option<Command> {
        match self.phase {
            ConsolePhase::Error(_) => {
                info!("reloading console");
                Some(self.start())
            }
            _ => None,
        }
    }

    /// Resolves the initial load once GetUser has an answer. A failed
    /// fetch wins over data cached by an earlier load.
    pub fn on_user_state(&mut self, user: &QueryState<User>) {
        if self.phase != ConsolePhase::Initializing || user.loading {
            return;
        }
        if let Some(error) = &user.error {
            info!(%error, "initial user load failed");
            self.phase = ConsolePhase::Error(error.clone());
        } else if user.data.is_some() {
            info!("user loaded; console ready");
            self.phase = ConsolePhase::Ready;
        }
    }

    pub fn submit_bet(&mut self) -> Option<Command> {
        if self.phase != ConsolePhase::Ready {
            debug!(phase = ?self.phase, "bet submission ignored");
            return None;
        }
        let variables = self.form.variables();
        info!(?variables, "submitting bet");
        self.phase = ConsolePhase::Submitting(MutationKind::PlaceBet);
        Some(Command::PlaceBet(variables))
    }

    pub fn withdraw(&mut self, user: Option<&User>) -> Option<Command> {
        if !self.controls(user).withdraw_enabled {
            debug!(phase = ?self.phase, "withdraw ignored; control disabled");
            return None;
        }
        info!("submitting withdraw");
        self.phase = ConsolePhase::Submitting(MutationKind::Withdraw);
        Some(Command::Withdraw)
    }

    pub fn toggle_history(&mut self) {
        self.show_history = !self.show_history;
    }

    /// Reports a finished mutation. Success keeps the console busy until the
    /// returned refetch lands.
    pub fn on_mutation_settled(
        &mut self,
        result: Result<MutationOutcome, ClientError>,
        notifier: &mut impl Notifier,
    ) -> Option<Command> {
        match result {
            Ok(MutationOutcome::BetPlaced(placed)) => {
                notifier.notify(ToastKind::Success, format!("You {}!", placed.result));
                if let Some(message) = placed.message.filter(|m| !m.is_empty()) {
                    notifier.notify(ToastKind::Info, message);
                }
                self.refetch_pending = true;
                Some(Command::RefetchAll)
            }
            Ok(MutationOutcome::Withdrawn(receipt)) => {
                let message = receipt
                    .message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| WITHDRAW_FALLBACK_MESSAGE.to_string());
                notifier.notify(ToastKind::Success, message);
                self.refetch_pending = true;
                Some(Command::RefetchAll)
            }
            Err(err) => {
                let message = err.to_string();
                notifier.notify(ToastKind::Error, message.clone());
                self.phase = if err.is_timeout() {
                    ConsolePhase::Error(message)
                } else {
                    ConsolePhase::Ready
                };
                None
            }
        }
    }

    pub fn on_refetched(
        &mut self,
        result: Result<(), ClientError>,
        user: &QueryState<User>,
        notifier: &mut impl Notifier,
    ) {
        self.refetch_pending = false;
        if self.phase == ConsolePhase::Initializing {
            self.on_user_state(user);
            // a GetUser failure is shown by the error screen itself
            if self.phase != ConsolePhase::Ready {
                return;
            }
        }
        if let Err(err) = result {
            notifier.notify(ToastKind::Error, err.to_string());
        }
        if self.is_busy() {
            self.phase = ConsolePhase::Ready;
        }
    }

    /// Abandons the in-flight mutation. The server may or may not have
    /// applied it, so the caller refetches. Once the mutation has settled
    /// there is nothing left to cancel.
    pub fn cancel(&mut self, notifier: &mut impl Notifier) -> Option<Command> {
        if !self.is_busy() {
            return None;
        }
        if self.refetch_pending {
            debug!("cancel ignored; mutation already settled");
            return None;
        }
        info!(phase = ?self.phase, "cancelling in-flight request");
        notifier.notify(ToastKind::Error, CANCELLED_MESSAGE.to_string());
        self.phase = ConsolePhase::Ready;
        Some(Command::RefetchAll)
    }

    pub fn focus_next(&mut self) {
        self.focus = self.focus.next();
    }

    pub fn focus_prev(&mut self) {
        self.focus = self.focus.prev();
    }

    pub fn input_char(&mut self, c: char) {
        if let Some(field) = self.focused_field() {
            field.push(c);
        }
    }

    pub fn backspace(&mut self) {
        if let Some(field) = self.focused_field() {
            field.pop();
        }
    }

    /// Presses whatever has focus. Enter inside an input submits the bet.
    pub fn activate(&mut self, user: Option<&User>) -> Option<Command> {
        match self.focus {
            Focus::Amount | Focus::DiceNumber | Focus::SubmitBet => self.submit_bet(),
            Focus::Withdraw => self.withdraw(user),
            Focus::History => {
                self.toggle_history();
                None
            }
        }
    }

    fn focused_field(&mut self) -> Option<&mut String> {
        match self.focus {
            Focus::Amount => Some(&mut self.form.amount),
            Focus::DiceNumber => Some(&mut self.form.dice_number),
            _ => None,
        }
    }
}

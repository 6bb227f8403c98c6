use crate::{
    pricing::Pricing,
    session::{
        ChainSnapshot,
        PendingTransaction,
        TxPhase,
    },
};
use color_eyre::eyre::{
    Result,
    eyre,
};
use crossterm::{
    event::{
        self,
        Event,
        KeyCode,
        KeyEventKind,
    },
    terminal::{
        disable_raw_mode,
        enable_raw_mode,
    },
};
use fuels::types::Address;
use ratatui::{
    prelude::*,
    widgets::*,
};
use std::io::stdout;
use tokio::sync::mpsc;

pub type InputEventReceiver = mpsc::UnboundedReceiver<std::io::Result<Event>>;

pub enum UserEvent {
    Quit,
    Redraw,
    /// Run whatever the action panel currently offers.
    Activate,
    Connect,
    Unlock(String),
    Refresh,
    DismissAlert,
}

/// Everything the screen shows, captured from the session between awaits.
#[derive(Clone, Debug, Default)]
pub struct ScreenSnapshot {
    pub connected: bool,
    pub locked: bool,
    pub account: Option<Address>,
    pub network_id: Option<u64>,
    pub expected_network: u64,
    pub chain: ChainSnapshot,
    pub phase: TxPhase,
    pub pending: Option<PendingTransaction>,
    pub status: String,
    pub errors: Vec<String>,
    pub alert: Option<String>,
    pub pricing: Pricing,
}

/// The one action offered below the balances.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PrimaryAction {
    Connect,
    Loading,
    Withdraw,
    Claim { tokens: u64 },
    Mint { amount: u64, enabled: bool },
}

pub fn primary_action(snap: &ScreenSnapshot, mint_amount: u64) -> PrimaryAction {
    if !snap.connected {
        return PrimaryAction::Connect;
    }
    if snap.phase != TxPhase::Idle {
        return PrimaryAction::Loading;
    }
    if snap.chain.is_owner {
        return PrimaryAction::Withdraw;
    }
    if snap.chain.claimable_count > 0 {
        return PrimaryAction::Claim {
            tokens: snap.pricing.claimable_tokens(snap.chain.claimable_count),
        };
    }
    PrimaryAction::Mint {
        amount: mint_amount,
        enabled: mint_amount > 0,
    }
}

#[derive(Debug, Default)]
pub struct UiState {
    mode: Mode,
    mint_amount: u64,
    alert_open: bool,
    terminal: Option<Terminal<CrosstermBackend<std::io::Stdout>>>,
}

#[derive(Clone, Debug, Default)]
enum Mode {
    #[default]
    Normal,
    Password(String),
    QuitModal,
}

impl UiState {
    pub fn mint_amount(&self) -> u64 {
        self.mint_amount
    }

    pub fn open_password_prompt(&mut self) {
        self.mode = Mode::Password(String::new());
    }
}

pub fn terminal_enter(state: &mut UiState) -> Result<()> {
    enable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), crossterm::terminal::EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout());
    state.terminal = Some(Terminal::new(backend)?);
    Ok(())
}

pub fn terminal_exit() -> Result<()> {
    disable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), crossterm::terminal::LeaveAlternateScreen)?;
    Ok(())
}

/// Reads terminal events on a blocking thread so the async loop never
/// blocks on stdin.
pub fn spawn_input_reader() -> InputEventReceiver {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        loop {
            let event = event::read();
            let failed = event.is_err();
            if tx.send(event).is_err() || failed {
                break;
            }
        }
    });
    rx
}

pub async fn next_raw_event(input: &mut InputEventReceiver) -> Result<Event> {
    match input.recv().await {
        Some(event) => Ok(event?),
        None => Err(eyre!("terminal input closed")),
    }
}

pub fn draw(state: &mut UiState, snap: &ScreenSnapshot) -> Result<()> {
    state.alert_open = snap.alert.is_some();
    if let Some(mut term) = state.terminal.take() {
        term.draw(|f| ui(f, state, snap))?;
        state.terminal = Some(term);
    }
    Ok(())
}

pub fn interpret_event(state: &mut UiState, event: Event) -> Option<UserEvent> {
    let Event::Key(k) = event else {
        return match event {
            Event::Resize(..) => Some(UserEvent::Redraw),
            _ => None,
        };
    };
    if k.kind != KeyEventKind::Press {
        return None;
    }
    if state.alert_open {
        return match k.code {
            KeyCode::Enter | KeyCode::Esc => {
                state.alert_open = false;
                Some(UserEvent::DismissAlert)
            }
            _ => None,
        };
    }
    match &mut state.mode {
        Mode::Password(input) => match k.code {
            KeyCode::Esc => {
                state.mode = Mode::Normal;
                Some(UserEvent::Redraw)
            }
            KeyCode::Enter => {
                let password = std::mem::take(input);
                state.mode = Mode::Normal;
                Some(UserEvent::Unlock(password))
            }
            KeyCode::Backspace => {
                input.pop();
                Some(UserEvent::Redraw)
            }
            KeyCode::Char(c) => {
                input.push(c);
                Some(UserEvent::Redraw)
            }
            _ => None,
        },
        Mode::QuitModal => match k.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => Some(UserEvent::Quit),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                state.mode = Mode::Normal;
                Some(UserEvent::Redraw)
            }
            _ => None,
        },
        Mode::Normal => match k.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                state.mode = Mode::QuitModal;
                Some(UserEvent::Redraw)
            }
            KeyCode::Enter => Some(UserEvent::Activate),
            KeyCode::Char('c') => Some(UserEvent::Connect),
            KeyCode::Char('r') => Some(UserEvent::Refresh),
            KeyCode::Char(c) if c.is_ascii_digit() => {
                let digit = u64::from(c.to_digit(10)?);
                state.mint_amount = state.mint_amount.saturating_mul(10).saturating_add(digit);
                Some(UserEvent::Redraw)
            }
            KeyCode::Backspace => {
                state.mint_amount /= 10;
                Some(UserEvent::Redraw)
            }
            KeyCode::Up | KeyCode::Char('+') => {
                state.mint_amount = state.mint_amount.saturating_add(1);
                Some(UserEvent::Redraw)
            }
            KeyCode::Down | KeyCode::Char('-') => {
                state.mint_amount = state.mint_amount.saturating_sub(1);
                Some(UserEvent::Redraw)
            }
            _ => None,
        },
    }
}

fn ui(f: &mut Frame, state: &UiState, snap: &ScreenSnapshot) {
    f.render_widget(Clear, f.area());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // title
            Constraint::Length(3), // wallet
            Constraint::Min(7),    // balances + action
            Constraint::Length(8), // status/errors
            Constraint::Length(3), // help
        ])
        .split(f.area());

    draw_title(f, chunks[0]);
    draw_wallet_panel(f, chunks[1], snap);
    draw_sale_panel(f, state, chunks[2], snap);
    draw_status(f, chunks[3], snap);
    draw_help(f, chunks[4]);
    draw_modals(f, state, snap);
}

fn draw_title(f: &mut Frame, area: Rect) {
    let title = Paragraph::new(vec![
        Line::from("Welcome to Crypto Devs").style(Style::default().bold()),
        Line::from("You can mint or claim Crypto Dev Token here"),
    ])
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL).title("Crypto Devs ICO"));
    f.render_widget(title, area);
}

fn draw_wallet_panel(f: &mut Frame, area: Rect, snap: &ScreenSnapshot) {
    let text = if snap.connected {
        let account = snap
            .account
            .map(|a| short_address(&a))
            .unwrap_or_else(|| String::from("unknown"));
        let network = snap
            .network_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| String::from("?"));
        format!(
            "Account: {} | Network: {} (expected {})",
            account, network, snap.expected_network
        )
    } else if snap.locked {
        String::from("Wallet locked")
    } else {
        String::from("Not connected")
    };
    let widget =
        Paragraph::new(text).block(Block::default().borders(Borders::ALL).title("Wallet"));
    f.render_widget(widget, area);
}

fn draw_sale_panel(f: &mut Frame, state: &UiState, area: Rect, snap: &ScreenSnapshot) {
    let pricing = &snap.pricing;
    let mut lines: Vec<Line> = Vec::new();
    if snap.connected {
        lines.push(Line::from(format!(
            "You have minted {} Crypto Dev Tokens",
            pricing.format_tokens(snap.chain.caller_balance)
        )));
        lines.push(Line::from(format!(
            "Overall {}/{} have been minted!!!",
            pricing.format_tokens(snap.chain.total_minted),
            pricing.max_supply
        )));
        lines.push(Line::from(""));
    }
    lines.extend(action_lines(primary_action(snap, state.mint_amount), snap));
    let widget = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Token Sale"));
    f.render_widget(widget, area);
}

fn action_lines(action: PrimaryAction, snap: &ScreenSnapshot) -> Vec<Line<'static>> {
    let button = Style::default().fg(Color::Black).bg(Color::Cyan);
    match action {
        PrimaryAction::Connect => vec![Line::from(
            Span::styled(" [c] Connect your wallet ", button),
        )],
        PrimaryAction::Loading => {
            let detail = match snap.phase {
                TxPhase::Submitting => "submitting",
                TxPhase::AwaitingConfirmation => "waiting for confirmation",
                TxPhase::RefreshingReads => "refreshing balances",
                TxPhase::Idle => "",
            };
            let subject = match snap.pending {
                Some(PendingTransaction {
                    kind,
                    amount: Some(amount),
                    payment,
                }) => format!(
                    "{kind} of {amount} tokens for {}",
                    snap.pricing.format_payment(payment)
                ),
                Some(pending) => pending.kind.to_string(),
                None => String::new(),
            };
            vec![
                Line::from(Span::styled(" Loading... ", button)),
                Line::from(format!("{subject} {detail}").trim().to_owned())
                    .style(Style::default().fg(Color::DarkGray)),
            ]
        }
        PrimaryAction::Withdraw => vec![Line::from(Span::styled(
            " [Enter] Withdraw Coins ",
            Style::default().fg(Color::Black).bg(Color::Yellow),
        ))],
        PrimaryAction::Claim { tokens } => vec![
            Line::from(format!("{tokens} to be claimed!")),
            Line::from(Span::styled(" [Enter] Claim Tokens ", button)),
        ],
        PrimaryAction::Mint { amount, enabled } => {
            let cost = snap
                .pricing
                .payment_for(amount)
                .map(|p| snap.pricing.format_payment(p))
                .unwrap_or_else(|| String::from("too much"));
            let style = if enabled {
                button
            } else {
                Style::default().fg(Color::DarkGray)
            };
            vec![
                Line::from(format!("Amount of Tokens: {amount} (costs {cost})")),
                Line::from(Span::styled(" [Enter] Mint Tokens ", style)),
            ]
        }
    }
}

fn draw_status(f: &mut Frame, area: Rect, snap: &ScreenSnapshot) {
    let widget = if snap.errors.is_empty() {
        let status = if snap.status.trim().is_empty() {
            "Ready"
        } else {
            snap.status.as_str()
        };
        Paragraph::new(status.to_owned())
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title("Status"))
            .style(Style::default().fg(Color::Green))
    } else {
        let mut lines = vec![Line::from(snap.status.clone())];
        lines.extend(snap.errors.iter().map(|e| Line::from(e.clone())));
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title("Errors"))
            .style(Style::default().fg(Color::Red))
    };
    f.render_widget(widget, area);
}

fn draw_help(f: &mut Frame, area: Rect) {
    let help = Paragraph::new(
        "digits/+/- amount | Enter action | c connect | r refresh | q/Esc quit",
    )
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(help, area);
}

fn draw_modals(f: &mut Frame, state: &UiState, snap: &ScreenSnapshot) {
    if let Some(alert) = &snap.alert {
        let area = centered_rect(50, 25, f.area());
        let block = Block::default().borders(Borders::ALL).title("Alert");
        let p = Paragraph::new(format!("{alert}\n\nEnter/Esc to dismiss"))
            .wrap(Wrap { trim: false });
        f.render_widget(Clear, area);
        f.render_widget(block.clone(), area);
        f.render_widget(p, block.inner(area));
        return;
    }
    match &state.mode {
        Mode::Password(input) => {
            let area = centered_rect(50, 25, f.area());
            let block = Block::default().borders(Borders::ALL).title("Unlock Wallet");
            let masked = "*".repeat(input.chars().count());
            let p = Paragraph::new(format!(
                "Password: {masked}\nEnter=unlock Esc=cancel"
            ));
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(p, block.inner(area));
        }
        Mode::QuitModal => {
            let area = centered_rect(30, 20, f.area());
            let block = Block::default().borders(Borders::ALL).title("Quit");
            let p = Paragraph::new("Quit the client? (y/n)");
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(p, block.inner(area));
        }
        Mode::Normal => {}
    }
}

fn short_address(address: &Address) -> String {
    let hex = format!("{address}");
    if hex.len() <= 12 {
        return hex;
    }
    format!("0x{}…{}", &hex[..6], &hex[hex.len() - 4..])
}

fn centered_rect(w_percent: u16, h_percent: u16, r: Rect) -> Rect {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - h_percent) / 2),
            Constraint::Percentage(h_percent),
            Constraint::Percentage((100 - h_percent) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - w_percent) / 2),
            Constraint::Percentage(w_percent),
            Constraint::Percentage((100 - w_percent) / 2),
        ])
        .split(rows[1])[1]
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crossterm::event::{
        KeyEvent,
        KeyModifiers,
    };

    fn connected() -> ScreenSnapshot {
        ScreenSnapshot {
            connected: true,
            ..ScreenSnapshot::default()
        }
    }

    fn press(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn primary_action__disconnected__offers_connect() {
        let snap = ScreenSnapshot::default();

        assert_eq!(primary_action(&snap, 3), PrimaryAction::Connect);
    }

    #[test]
    fn primary_action__busy_owner__shows_loading_first() {
        // given
        let mut snap = connected();
        snap.phase = TxPhase::AwaitingConfirmation;
        snap.chain.is_owner = true;
        snap.chain.claimable_count = 2;

        // when
        let action = primary_action(&snap, 1);

        // then
        assert_eq!(action, PrimaryAction::Loading);
    }

    #[test]
    fn primary_action__owner_with_claimable__offers_withdraw() {
        let mut snap = connected();
        snap.chain.is_owner = true;
        snap.chain.claimable_count = 2;

        assert_eq!(primary_action(&snap, 1), PrimaryAction::Withdraw);
    }

    #[test]
    fn primary_action__claimable_collectibles__offers_ten_tokens_each() {
        let mut snap = connected();
        snap.chain.claimable_count = 3;

        assert_eq!(
            primary_action(&snap, 1),
            PrimaryAction::Claim { tokens: 30 }
        );
    }

    #[test]
    fn primary_action__zero_amount__disables_mint() {
        let snap = connected();

        assert_eq!(
            primary_action(&snap, 0),
            PrimaryAction::Mint {
                amount: 0,
                enabled: false
            }
        );
        assert_eq!(
            primary_action(&snap, 4),
            PrimaryAction::Mint {
                amount: 4,
                enabled: true
            }
        );
    }

    #[test]
    fn interpret_event__digits__build_mint_amount() {
        // given
        let mut state = UiState::default();

        // when
        interpret_event(&mut state, press(KeyCode::Char('1')));
        interpret_event(&mut state, press(KeyCode::Char('2')));
        interpret_event(&mut state, press(KeyCode::Backspace));
        interpret_event(&mut state, press(KeyCode::Char('5')));

        // then
        assert_eq!(state.mint_amount(), 15);
    }

    #[test]
    fn interpret_event__open_alert__swallows_keys_until_dismissed() {
        // given
        let mut state = UiState::default();
        state.alert_open = true;

        // when
        let digit = interpret_event(&mut state, press(KeyCode::Char('7')));
        let dismiss = interpret_event(&mut state, press(KeyCode::Enter));

        // then
        assert!(digit.is_none());
        assert!(matches!(dismiss, Some(UserEvent::DismissAlert)));
        assert_eq!(state.mint_amount(), 0);
    }

    #[test]
    fn interpret_event__password_prompt__collects_characters() {
        // given
        let mut state = UiState::default();
        state.open_password_prompt();

        // when
        for c in "hunter2".chars() {
            interpret_event(&mut state, press(KeyCode::Char(c)));
        }
        let submitted = interpret_event(&mut state, press(KeyCode::Enter));

        // then
        assert!(matches!(submitted, Some(UserEvent::Unlock(p)) if p == "hunter2"));
        assert!(matches!(state.mode, Mode::Normal));
    }
}

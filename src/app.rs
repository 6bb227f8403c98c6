use crate::{
    chain::{
        TxKind,
        WalletConnector,
    },
    error::SessionError,
    fuel::KeystoreConnector,
    session::{
        Session,
        TxPhase,
    },
    ui::{
        self,
        PrimaryAction,
        ScreenSnapshot,
        UserEvent,
    },
};
use color_eyre::eyre::{
    Result,
    WrapErr,
};
use std::{
    collections::VecDeque,
    time::Duration,
};
use tokio::{
    sync::watch,
    time,
};
use tracing::{
    debug,
    info,
};

const VISIBLE_ERRORS: usize = 5;

/// Alerts raised by the session, shown one at a time until dismissed.
#[derive(Debug, Default)]
pub struct AlertQueue {
    alerts: VecDeque<String>,
}

impl AlertQueue {
    /// Moves any alert the session raised into the queue.
    pub fn collect<W: WalletConnector>(&mut self, session: &mut Session<W>) {
        if let Some(alert) = session.take_alert()
            && self.alerts.back() != Some(&alert)
        {
            self.alerts.push_back(alert);
        }
    }

    pub fn current(&self) -> Option<&String> {
        self.alerts.front()
    }

    pub fn dismiss(&mut self) {
        self.alerts.pop_front();
    }
}

pub fn screen_snapshot<W: WalletConnector>(
    session: &Session<W>,
    alerts: &AlertQueue,
    locked: bool,
) -> ScreenSnapshot {
    ScreenSnapshot {
        connected: session.is_connected(),
        locked,
        account: session.wallet().account,
        network_id: session.wallet().network_id,
        expected_network: session.settings().expected_network,
        chain: session.snapshot().clone(),
        phase: session.phase(),
        pending: session.pending().copied(),
        status: session.status().to_owned(),
        errors: session.recent_errors(VISIBLE_ERRORS),
        alert: alerts.current().cloned(),
        pricing: session.settings().pricing,
    }
}

/// Runs the action the screen offers. `Connect` and `Loading` are handled by
/// the caller, so they do nothing here.
pub async fn perform<W: WalletConnector>(
    session: &mut Session<W>,
    action: PrimaryAction,
) -> Option<Result<(), SessionError>> {
    let outcome = match action {
        PrimaryAction::Withdraw => session.withdraw().await,
        PrimaryAction::Claim { .. } => session.claim().await,
        PrimaryAction::Mint {
            amount,
            enabled: true,
        } => session.mint(amount).await,
        PrimaryAction::Mint { enabled: false, .. }
        | PrimaryAction::Connect
        | PrimaryAction::Loading => return None,
    };
    Some(outcome.map(|receipt| debug!(tx_id = %receipt.tx_id, "write finished")))
}

fn processing_message(action: PrimaryAction) -> Option<String> {
    let kind = match action {
        PrimaryAction::Withdraw => TxKind::Withdraw,
        PrimaryAction::Claim { .. } => TxKind::Claim,
        PrimaryAction::Mint { enabled: true, .. } => TxKind::Mint,
        _ => return None,
    };
    Some(format!("Sending {kind} transaction..."))
}

fn show_processing_status(
    ui_state: &mut ui::UiState,
    screen: &mut ScreenSnapshot,
    message: impl Into<String>,
    context: &'static str,
) -> Result<()> {
    screen.status = message.into();
    ui::draw(ui_state, screen).wrap_err(context)
}

/// Drives `work` to completion while redrawing whenever the session's phase
/// changes. The future is never dropped early.
async fn drive_with_phases<T>(
    work: impl Future<Output = T>,
    mut phases: watch::Receiver<TxPhase>,
    ui_state: &mut ui::UiState,
    screen: &mut ScreenSnapshot,
) -> Result<T> {
    tokio::pin!(work);
    let mut phases_open = true;
    loop {
        tokio::select! {
            out = &mut work => return Ok(out),
            changed = phases.changed(), if phases_open => {
                if changed.is_err() {
                    phases_open = false;
                    continue;
                }
                screen.phase = *phases.borrow_and_update();
                ui::draw(ui_state, screen).wrap_err("draw during transaction failed")?;
            }
        }
    }
}

pub async fn run_app(
    session: Session<KeystoreConnector>,
    refresh_interval: Duration,
) -> Result<()> {
    let mut ui_state = ui::UiState::default();
    let mut input_events = ui::spawn_input_reader();

    ui::terminal_enter(&mut ui_state)?;
    info!("UI ready");
    let res = run_loop(session, refresh_interval, &mut ui_state, &mut input_events).await;
    ui::terminal_exit()?;
    res
}

async fn run_loop(
    mut session: Session<KeystoreConnector>,
    refresh_interval: Duration,
    ui_state: &mut ui::UiState,
    input_events: &mut ui::InputEventReceiver,
) -> Result<()> {
    let mut alerts = AlertQueue::default();
    let locked = |s: &Session<KeystoreConnector>| !s.connector().has_password();

    let mut screen = screen_snapshot(&session, &alerts, locked(&session));
    show_processing_status(ui_state, &mut screen, "Connecting...", "initial draw failed")?;
    let phases = session.subscribe_phase();
    drive_with_phases(session.initial_load(), phases, ui_state, &mut screen).await?;
    alerts.collect(&mut session);
    if !session.is_connected() && locked(&session) {
        ui_state.open_password_prompt();
    }

    let mut ticker = time::interval(refresh_interval);
    ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        let screen = screen_snapshot(&session, &alerts, locked(&session));
        ui::draw(ui_state, &screen).wrap_err("draw failed")?;

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received interrupt, exiting");
                break;
            }
            _ = ticker.tick() => {
                if session.is_connected() && !session.is_busy() {
                    session.refresh_reads().await;
                    alerts.collect(&mut session);
                }
            }
            raw_ev = ui::next_raw_event(input_events) => {
                let Some(ev) = ui::interpret_event(ui_state, raw_ev?) else {
                    continue;
                };
                match ev {
                    UserEvent::Quit => break,
                    UserEvent::Redraw => {}
                    UserEvent::DismissAlert => alerts.dismiss(),
                    UserEvent::Refresh => {
                        if session.is_connected() && !session.is_busy() {
                            session.refresh_reads().await;
                            alerts.collect(&mut session);
                        }
                    }
                    UserEvent::Connect => {
                        if locked(&session) {
                            ui_state.open_password_prompt();
                        } else {
                            reconnect(&mut session, &mut alerts, ui_state).await?;
                        }
                    }
                    UserEvent::Unlock(password) => {
                        session.connector_mut().set_password(password);
                        reconnect(&mut session, &mut alerts, ui_state).await?;
                    }
                    UserEvent::Activate => {
                        let mut screen = screen_snapshot(&session, &alerts, locked(&session));
                        let action = ui::primary_action(&screen, ui_state.mint_amount());
                        if action == PrimaryAction::Connect {
                            if locked(&session) {
                                ui_state.open_password_prompt();
                            } else {
                                reconnect(&mut session, &mut alerts, ui_state).await?;
                            }
                            continue;
                        }
                        let Some(message) = processing_message(action) else {
                            continue;
                        };
                        show_processing_status(
                            ui_state,
                            &mut screen,
                            message,
                            "draw before transaction failed",
                        )?;
                        let phases = session.subscribe_phase();
                        drive_with_phases(
                            perform(&mut session, action),
                            phases,
                            ui_state,
                            &mut screen,
                        )
                        .await?;
                        alerts.collect(&mut session);
                    }
                }
            }
        }
    }
    Ok(())
}

async fn reconnect(
    session: &mut Session<KeystoreConnector>,
    alerts: &mut AlertQueue,
    ui_state: &mut ui::UiState,
) -> Result<()> {
    let mut screen = screen_snapshot(session, alerts, false);
    show_processing_status(ui_state, &mut screen, "Connecting...", "draw before connect failed")?;
    if session.connect().await.is_ok() {
        session.refresh_reads().await;
    }
    alerts.collect(session);
    Ok(())
}

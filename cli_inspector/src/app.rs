use std::time::{Duration, Instant};

use color_eyre::Result;
use crossbeam_channel::{Receiver, Sender};
use crossterm::event::{self, Event, KeyCode};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::info;

use core_vitrine::{EngineConfig, LogEnvelope};
use vitrine_runtime::{
    decode_frame, encode_command, parse_command_line, CommandEnvelope, CommandPayload,
};

use crate::ui::{draw_ui, UiState};

pub struct InspectorApp {
    terminal: Terminal<CrosstermBackend<std::io::Stdout>>,
    ui_state: UiState,
    frames: Receiver<Vec<u8>>,
    commands: Sender<Vec<u8>>,
    logs: Receiver<LogEnvelope>,
    next_correlation: u64,
}

impl InspectorApp {
    pub fn new(
        config: &EngineConfig,
        frames: Receiver<Vec<u8>>,
        commands: Sender<Vec<u8>>,
        logs: Receiver<LogEnvelope>,
    ) -> Result<Self> {
        let stdout = std::io::stdout();
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        crossterm::terminal::enable_raw_mode()?;
        terminal.clear()?;
        terminal.hide_cursor()?;
        Ok(Self {
            terminal,
            ui_state: UiState::new(config),
            frames,
            commands,
            logs,
            next_correlation: 0,
        })
    }

    pub fn run(mut self) -> Result<()> {
        let mut last_draw = Instant::now();

        loop {
            while let Ok(bytes) = self.frames.try_recv() {
                match decode_frame(&bytes) {
                    Ok(frame) => self.ui_state.push_frame(frame),
                    Err(err) => self.ui_state.push_log(format!("frame decode failed: {err}")),
                }
            }

            while let Ok(envelope) = self.logs.try_recv() {
                self.ui_state.push_log(format_envelope(&envelope));
            }

            if last_draw.elapsed() >= Duration::from_millis(100) {
                self.terminal.draw(|frame| draw_ui(frame, &self.ui_state))?;
                last_draw = Instant::now();
            }

            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if self.ui_state.command_mode {
                        self.handle_command_key(key.code);
                        continue;
                    }
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => break,
                        KeyCode::Char('h') => {
                            let visible = !self.ui_state.visible;
                            self.ui_state.visible = visible;
                            self.send(CommandPayload::SetVisibility { visible });
                        }
                        KeyCode::Char('m') => {
                            let enabled = !self.ui_state.reduced_motion;
                            self.ui_state.reduced_motion = enabled;
                            self.send(CommandPayload::SetReducedMotion { enabled });
                        }
                        KeyCode::Char('v') => {
                            let wide = !self.ui_state.wide_viewport;
                            self.ui_state.wide_viewport = wide;
                            self.send(CommandPayload::SetViewport { wide });
                        }
                        KeyCode::Char(':') => {
                            self.ui_state.command_mode = true;
                            self.ui_state.command_input.clear();
                        }
                        _ => {}
                    }
                }
            }
        }

        self.restore_terminal()?;
        Ok(())
    }

    fn handle_command_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Esc => {
                self.ui_state.command_mode = false;
                self.ui_state.command_input.clear();
            }
            KeyCode::Enter => {
                let line = std::mem::take(&mut self.ui_state.command_input);
                self.ui_state.command_mode = false;
                match parse_command_line(&line) {
                    Ok(payload) => {
                        info!(command = %line.trim(), "console command accepted");
                        self.send(payload);
                    }
                    Err(err) => self.ui_state.push_log(format!("command error: {err}")),
                }
            }
            KeyCode::Backspace => {
                self.ui_state.command_input.pop();
            }
            KeyCode::Char(c) => self.ui_state.command_input.push(c),
            _ => {}
        }
    }

    fn send(&mut self, payload: CommandPayload) {
        self.next_correlation += 1;
        let envelope = CommandEnvelope::with_correlation(payload, self.next_correlation);
        match encode_command(&envelope) {
            Ok(bytes) => {
                if self.commands.send(bytes).is_err() {
                    self.ui_state.push_log("engine worker is gone");
                }
            }
            Err(err) => self.ui_state.push_log(format!("command encode failed: {err}")),
        }
    }

    fn restore_terminal(&mut self) -> Result<()> {
        crossterm::terminal::disable_raw_mode()?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

fn format_envelope(envelope: &LogEnvelope) -> String {
    if envelope.fields.is_empty() {
        format!("{:>5} {}", envelope.level, envelope.message)
    } else {
        let fields = serde_json::to_string(&envelope.fields).unwrap_or_default();
        format!("{:>5} {} {}", envelope.level, envelope.message, fields)
    }
}

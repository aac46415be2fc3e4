use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseButton, MouseEvent,
    MouseEventKind,
};
use crossterm::execute;
use geojson::FeatureCollection;
use project_map::api::{AuthClient, LoginRequest};
use project_map::app::{App, AppData};
use project_map::config::{Cli, Command, Config, ViewArgs};
use project_map::data::{self, demo};
use project_map::logging::init_logging;
use project_map::ui;
use ratatui::DefaultTerminal;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

fn main() -> Result<()> {
    let config = Config::from(Cli::parse());
    let _logging = init_logging(&config.log_dir, !config.is_interactive())
        .with_context(|| format!("cannot open log directory {}", config.log_dir.display()))?;

    match &config.command {
        Command::View => view(&config.view),
        command => run_api_command(&config.api_url, command),
    }
}

fn run_api_command(api_url: &str, command: &Command) -> Result<()> {
    let client = AuthClient::new(api_url)?;
    let response = match command {
        Command::Login { username, password } => {
            let token = client
                .sign_in(&LoginRequest {
                    username: username.clone(),
                    password: password.clone(),
                })
                .context("sign in failed")?;
            serde_json::to_value(token)?
        }
        Command::GoogleLogin => client.google_login().context("google login failed")?,
        Command::Callback { query } => client.callback(query.as_deref()).context("callback failed")?,
        Command::Logout { token } => with_token(client, token.as_deref()).logout().context("logout failed")?,
        Command::Profile(args) => with_token(client, args.token.as_deref())
            .update_profile(args.user_id, &args.to_update())
            .context("profile update failed")?,
        Command::View => return Ok(()),
    };
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

fn with_token(client: AuthClient, token: Option<&str>) -> AuthClient {
    match token {
        Some(token) => client.with_token(token),
        None => client,
    }
}

/// Load a geometry file, warning and returning `None` when it is unusable
fn load(path: Option<&Path>, filter: bool) -> Option<FeatureCollection> {
    let path = path?;
    match data::load_feature_collection(path, filter) {
        Ok(collection) => Some(collection),
        Err(err) => {
            warn!(path = %path.display(), %err, "ignoring geometry file");
            None
        }
    }
}

fn view(args: &ViewArgs) -> Result<()> {
    let area = load(args.area.as_deref(), true);
    let split = load(args.split.as_deref(), true);
    let points = load(args.points.as_deref(), false);

    let data = AppData {
        area: area.or_else(|| (args.area.is_none() && args.points.is_none()).then(demo::project_area)),
        split,
        points: points.unwrap_or_else(|| demo::points(args.demo_points)),
        split_meters: args.split_meters,
    };

    let mut terminal = ratatui::init();
    terminal.clear()?;
    execute!(std::io::stdout(), EnableMouseCapture)?;

    let result = run(&mut terminal, data);

    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();

    result
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::ScrollUp => app.zoom_at(mouse.column, mouse.row, 1.0),
        MouseEventKind::ScrollDown => app.zoom_at(mouse.column, mouse.row, -1.0),
        MouseEventKind::ScrollLeft => app.pan(-1.0, 0.0),
        MouseEventKind::ScrollRight => app.pan(1.0, 0.0),
        MouseEventKind::Down(MouseButton::Left) => {
            app.click(mouse.column, mouse.row);
            app.last_mouse = Some((mouse.column, mouse.row));
        }
        MouseEventKind::Drag(MouseButton::Left) => app.drag(mouse.column, mouse.row),
        MouseEventKind::Up(MouseButton::Left) => app.end_drag(),
        MouseEventKind::Moved => app.pointer_move(mouse.column, mouse.row),
        _ => {}
    }
}

fn run(terminal: &mut DefaultTerminal, data: AppData) -> Result<()> {
    let size = terminal.size()?;
    let mut app = App::new(size.width as usize, size.height as usize, data);
    info!(points = app.point_count(), tasks = app.split_cells(), "map opened");

    loop {
        terminal.draw(|frame| ui::render(frame, &app))?;

        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => app.quit(),

                    KeyCode::Left | KeyCode::Char('h') => app.pan(-1.0, 0.0),
                    KeyCode::Right | KeyCode::Char('l') => app.pan(1.0, 0.0),
                    KeyCode::Up | KeyCode::Char('k') => app.pan(0.0, -1.0),
                    KeyCode::Down | KeyCode::Char('j') => app.pan(0.0, 1.0),

                    KeyCode::Char('+') | KeyCode::Char('=') => app.zoom(1.0),
                    KeyCode::Char('-') | KeyCode::Char('_') => app.zoom(-1.0),

                    KeyCode::Char('a') | KeyCode::Char('A') => app.toggle_area(),
                    KeyCode::Char('s') | KeyCode::Char('S') => app.toggle_split(),
                    KeyCode::Char('c') | KeyCode::Char('C') => app.toggle_clusters(),
                    KeyCode::Char('[') => app.adjust_split(-1),
                    KeyCode::Char(']') => app.adjust_split(1),
                    KeyCode::Char('f') | KeyCode::Char('0') => app.refit(),
                    _ => {}
                },
                Event::Mouse(mouse) => handle_mouse(&mut app, mouse),
                Event::Resize(width, height) => app.resize(width as usize, height as usize),
                _ => {}
            }
        }

        // Animations and queued cluster lookups
        app.tick();

        if app.should_quit {
            break;
        }
    }

    app.shutdown();
    info!("map closed");
    Ok(())
}

use anyhow::Context;
use gui::App;
use iced::{Application, Settings};
use postboard_core::{AppConfig, ErrorExt};
use posts_client::{PostFetcher, PostsApiClient};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "postboard=debug,gui=debug,posts_client=debug,database=debug";

fn main() -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("Starting Postboard");

    let config = AppConfig::load()
        .map_err(|e| {
            e.log_error();
            e
        })
        .context("failed to load configuration")?;
    let fetcher: Arc<dyn PostFetcher> =
        Arc::new(PostsApiClient::from_config(&config).context("failed to build posts client")?);

    let settings = Settings {
        window: iced::window::Settings {
            size: iced::Size::new(900.0, 800.0),
            min_size: Some(iced::Size::new(400.0, 500.0)),
            ..Default::default()
        },
        ..Settings::with_flags(Flags {
            fetcher,
            database_url: config.database_url,
        })
    };

    PostboardApp::run(settings).map_err(|e| {
        tracing::error!("Application error: {}", e);
        anyhow::anyhow!("GUI error: {e}")
    })
}

struct Flags {
    fetcher: Arc<dyn PostFetcher>,
    database_url: String,
}

struct PostboardApp {
    app: App,
}

impl Application for PostboardApp {
    type Message = gui::Message;
    type Theme = iced::Theme;
    type Executor = iced::executor::Default;
    type Flags = Flags;

    fn new(flags: Self::Flags) -> (Self, iced::Command<Self::Message>) {
        tracing::info!("Initializing application");
        let mut app = App::new(flags.fetcher);
        let command = app.init(flags.database_url);
        (Self { app }, command)
    }

    fn title(&self) -> String {
        "Postboard".to_string()
    }

    fn update(&mut self, message: Self::Message) -> iced::Command<Self::Message> {
        match self.app.update(message) {
            Ok(command) => command,
            Err(e) => {
                e.log_error();
                iced::Command::none()
            }
        }
    }

    fn view(&self) -> iced::Element<Self::Message> {
        self.app.view()
    }
}

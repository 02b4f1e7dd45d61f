use database::{open_search_preference, SearchPreference};
use iced::widget::{
    button, column, container, horizontal_rule, row, scrollable, text, text_input, Column,
};
use iced::{Command, Element, Length, Theme};
use postboard_core::{CoreError, Post, PostGroup};
use posts_client::PostFetcher;
use std::sync::Arc;
use tracing::{debug, info};

pub mod detail;
pub mod screen;

pub use detail::PostDetail;
pub use screen::{FetchOutcome, FetchTask, HomeScreen, LoadState};

/// Placeholder cards shown while the first fetch is pending.
const SKELETON_CARDS: usize = 4;

#[derive(Debug, Clone)]
pub enum Message {
    PreferencesReady(SearchPreference, Option<String>),
    SearchChanged(String),
    Refresh,
    PostsLoaded(FetchOutcome),
    OpenPost(Post),
    Back,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Detail(PostDetail),
}

pub struct App {
    home: HomeScreen,
    route: Route,
}

impl App {
    pub fn new(fetcher: Arc<dyn PostFetcher>) -> Self {
        Self {
            home: HomeScreen::new(fetcher),
            route: Route::Home,
        }
    }

    /// Opens the preference store and starts the first fetch side by side.
    pub fn init(&mut self, database_url: String) -> Command<Message> {
        let open_preferences = Command::perform(
            async move {
                let preference = open_search_preference(&database_url).await;
                let restored = preference.load().await;
                (preference, restored)
            },
            |(preference, restored)| Message::PreferencesReady(preference, restored),
        );

        Command::batch([open_preferences, self.fetch()])
    }

    pub fn home(&self) -> &HomeScreen {
        &self.home
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn update(&mut self, message: Message) -> Result<Command<Message>, CoreError> {
        match message {
            Message::PreferencesReady(preference, restored) => {
                self.home.attach_preference(preference, restored);
                Ok(Command::none())
            }
            Message::SearchChanged(value) => {
                self.home.set_search(value);
                Ok(Command::none())
            }
            Message::Refresh => Ok(self.fetch()),
            Message::PostsLoaded(outcome) => {
                self.home.finish_fetch(outcome);
                Ok(Command::none())
            }
            Message::OpenPost(post) => {
                debug!("Opening post {}", post.id);
                self.route = Route::Detail(PostDetail::new(post));
                Ok(Command::none())
            }
            Message::Back => {
                self.route = Route::Home;
                Ok(Command::none())
            }
        }
    }

    fn fetch(&mut self) -> Command<Message> {
        match self.home.begin_fetch() {
            Some(task) => Command::perform(task.run(), Message::PostsLoaded),
            None => {
                info!("Refresh ignored while a fetch is pending");
                Command::none()
            }
        }
    }

    pub fn view(&self) -> Element<Message, Theme> {
        match &self.route {
            Route::Home => self.home_view(),
            Route::Detail(detail) => detail.view(),
        }
    }

    fn home_view(&self) -> Element<Message, Theme> {
        let title: Element<Message, Theme> = text("Posts").size(24).into();

        let search = text_input("Search by title", self.home.search())
            .on_input(Message::SearchChanged)
            .padding(10);

        let mut refresh = button("Refresh");
        if !self.home.is_fetching() {
            refresh = refresh.on_press(Message::Refresh);
        }

        let toolbar = row![search, refresh].spacing(10);

        let content: Element<Message, Theme> = match self.home.load_state() {
            LoadState::Idle | LoadState::Loading if self.home.posts().is_empty() => {
                skeleton_list()
            }
            LoadState::Failed(message) if self.home.posts().is_empty() => column![
                text(message).size(16),
                button("Retry").on_press(Message::Refresh)
            ]
            .spacing(10)
            .into(),
            state => {
                let groups = self.home.grouped();
                let mut list = Column::new().spacing(16);

                if let LoadState::Failed(message) = state {
                    list = list.push(text(message).size(14));
                }
                if groups.is_empty() {
                    list = list.push(text("No posts match your search").size(16));
                }
                for group in &groups {
                    list = list.push(group_view(group));
                }
                scrollable(list).into()
            }
        };

        let main_content: Element<Message, Theme> = column![title, toolbar, content]
            .spacing(20)
            .into();

        container(main_content)
            .width(Length::Fill)
            .height(Length::Fill)
            .padding(20)
            .into()
    }
}

fn group_view<'a>(group: &PostGroup) -> Element<'a, Message, Theme> {
    let mut cards = Column::new().spacing(10);
    cards = cards.push(text(format!("{} · {} posts", group.label(), group.len())).size(14));

    for post in &group.posts {
        cards = cards.push(post_card(post));
    }
    cards.into()
}

fn post_card<'a>(post: &Post) -> Element<'a, Message, Theme> {
    container(
        column![
            text(&post.title).size(16),
            text(&post.body).size(14),
            button("Read more").on_press(Message::OpenPost(post.clone()))
        ]
        .spacing(5),
    )
    .padding(10)
    .into()
}

fn skeleton_list<'a>() -> Element<'a, Message, Theme> {
    let mut list = Column::new().spacing(16);
    list = list.push(text("Loading posts...").size(14));

    for _ in 0..SKELETON_CARDS {
        list = list.push(skeleton_card());
    }
    list.into()
}

fn skeleton_card<'a>() -> Element<'a, Message, Theme> {
    container(
        column![
            skeleton_bar(120.0),
            skeleton_bar(320.0),
            skeleton_bar(480.0),
            skeleton_bar(260.0),
        ]
        .spacing(10),
    )
    .padding(10)
    .into()
}

fn skeleton_bar<'a>(width: f32) -> Element<'a, Message, Theme> {
    container(horizontal_rule(12))
        .width(Length::Fixed(width))
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use postboard_core::find_post;

    struct FixedFetcher;

    #[async_trait]
    impl PostFetcher for FixedFetcher {
        async fn fetch_posts(&self) -> Result<Vec<Post>, CoreError> {
            Ok(vec![
                Post {
                    id: 1,
                    user_id: 5,
                    title: "Apple pie".to_string(),
                    body: "Sweet".to_string(),
                },
                Post {
                    id: 3,
                    user_id: 9,
                    title: "apple tart".to_string(),
                    body: "Crisp".to_string(),
                },
            ])
        }
    }

    async fn loaded_app() -> App {
        let mut app = App::new(Arc::new(FixedFetcher));
        let task = app.home.begin_fetch().unwrap();
        let outcome = task.run().await;
        app.update(Message::PostsLoaded(outcome)).unwrap();
        app
    }

    #[tokio::test]
    async fn test_open_post_and_back() {
        let mut app = loaded_app().await;
        assert_eq!(app.route(), &Route::Home);

        let selected = find_post(&app.home().grouped(), 3).cloned().unwrap();
        app.update(Message::OpenPost(selected.clone())).unwrap();
        match app.route() {
            Route::Detail(detail) => {
                assert_eq!(detail.post(), &selected);
                assert_eq!(detail.post().title, "apple tart");
                assert_eq!(detail.user_label(), "User 9");
            }
            other => panic!("Expected detail route, got {:?}", other),
        }

        app.update(Message::Back).unwrap();
        assert_eq!(app.route(), &Route::Home);
        // The list screen kept its posts while the detail was shown.
        assert_eq!(app.home().posts().len(), 2);
    }

    #[tokio::test]
    async fn test_refresh_while_pending_is_ignored() {
        let mut app = App::new(Arc::new(FixedFetcher));
        let _ = app.update(Message::Refresh).unwrap();
        assert!(app.home().is_fetching());

        let _ = app.update(Message::Refresh).unwrap();
        assert!(app.home().is_fetching());
        assert_eq!(app.home().load_state(), &LoadState::Loading);
    }

    #[tokio::test]
    async fn test_search_message_updates_home() {
        let mut app = loaded_app().await;
        app.update(Message::SearchChanged("pie".to_string())).unwrap();
        assert_eq!(app.home().search(), "pie");
        assert_eq!(app.home().grouped().len(), 1);
    }

    #[tokio::test]
    async fn test_view_renders_in_every_state() {
        let mut app = App::new(Arc::new(FixedFetcher));
        let _ = app.view();

        let _ = app.update(Message::Refresh).unwrap();
        assert_eq!(app.home().load_state(), &LoadState::Loading);
        let _ = app.view();

        let mut app = loaded_app().await;
        let _ = app.view();
        let first = app.home().posts()[0].clone();
        app.update(Message::OpenPost(first)).unwrap();
        let _ = app.view();
    }
}

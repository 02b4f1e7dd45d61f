use crate::Message;
use iced::widget::{button, column, container, row, scrollable, text};
use iced::{Element, Length, Theme};
use postboard_core::Post;

/// Detail view for one post. Shows the value it was opened with; nothing is
/// fetched again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostDetail {
    post: Post,
}

impl PostDetail {
    pub fn new(post: Post) -> Self {
        Self { post }
    }

    pub fn post(&self) -> &Post {
        &self.post
    }

    pub fn user_label(&self) -> String {
        format!("User {}", self.post.user_id)
    }

    pub fn view(&self) -> Element<Message, Theme> {
        let header = row![
            button("← Back").on_press(Message::Back),
            text(self.user_label()).size(14),
        ]
        .spacing(20);

        let body = column![
            text("TITLE").size(12),
            text(&self.post.title).size(18),
            text("DESCRIPTION").size(12),
            text(&self.post.body).size(15),
        ]
        .spacing(8);

        container(column![header, scrollable(body)].spacing(16))
            .width(Length::Fill)
            .height(Length::Fill)
            .padding(16)
            .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_shows_post_verbatim() {
        let post = Post {
            id: 7,
            user_id: 3,
            title: "  Spaced Title ".to_string(),
            body: "line one\nline two".to_string(),
        };
        let detail = PostDetail::new(post.clone());

        assert_eq!(detail.user_label(), "User 3");
        assert_eq!(detail.post(), &post);
        assert_eq!(detail.post().title, "  Spaced Title ");
        assert_eq!(detail.post().body, "line one\nline two");
    }
}

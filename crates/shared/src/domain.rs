use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);
    };
}

id_newtype!(UserId);
id_newtype!(PostId);
id_newtype!(CommentId);
id_newtype!(ReplyId);
id_newtype!(CategoryId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoryFeed {
    Fresh,
    Top,
    Popular,
}

impl StoryFeed {
    pub fn as_path_segment(self) -> &'static str {
        match self {
            StoryFeed::Fresh => "fresh",
            StoryFeed::Top => "top",
            StoryFeed::Popular => "popular",
        }
    }
}

use super::{group::GroupOrChannel, session::SessionUser};

/// A collection tagged with where it came from.
///
/// Placeholder data keeps the UI navigable when the backend has nothing to
/// show; downstream code uses the tag to suppress mutations on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sourced<T> {
    Live(T),
    Placeholder(T),
}

impl<T> Sourced<T> {
    pub fn data(&self) -> &T {
        match self {
            Self::Live(data) | Self::Placeholder(data) => data,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder(_))
    }

    pub fn as_ref(&self) -> Sourced<&T> {
        match self {
            Self::Live(data) => Sourced::Live(data),
            Self::Placeholder(data) => Sourced::Placeholder(data),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Sourced<U> {
        match self {
            Self::Live(data) => Sourced::Live(f(data)),
            Self::Placeholder(data) => Sourced::Placeholder(f(data)),
        }
    }
}

pub type Collection = Sourced<Vec<GroupOrChannel>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedResource {
    StudyGroups,
    Channels,
    MyGroups,
}

impl FeedResource {
    pub const ALL: [FeedResource; 3] = [Self::StudyGroups, Self::Channels, Self::MyGroups];

    /// Cache key scoped to the resource type, never to a search term.
    pub fn cache_key(self) -> &'static str {
        match self {
            Self::StudyGroups => "studyGroups",
            Self::Channels => "channels",
            Self::MyGroups => "myGroups",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::StudyGroups => "study groups",
            Self::Channels => "channels",
            Self::MyGroups => "your groups",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSnapshot {
    pub groups: Collection,
    pub channels: Collection,
    /// `None` when nobody is signed in.
    pub my_groups: Option<Vec<GroupOrChannel>>,
}

impl FeedSnapshot {
    /// Client-side search over name, subject and description.
    pub fn filtered(&self, term: &str) -> FeedSnapshot {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return self.clone();
        }

        let keep = |items: &Vec<GroupOrChannel>| -> Vec<GroupOrChannel> {
            items
                .iter()
                .filter(|item| item.matches_lowercase(&needle))
                .cloned()
                .collect()
        };

        FeedSnapshot {
            groups: self.groups.as_ref().map(keep),
            channels: self.channels.as_ref().map(keep),
            my_groups: self.my_groups.as_ref().map(keep),
        }
    }

    pub fn find(&self, id: &str) -> Option<Sourced<&GroupOrChannel>> {
        let mine = self
            .my_groups
            .iter()
            .flatten()
            .find(|item| item.id == id)
            .map(Sourced::Live);

        mine.or_else(|| find_in(&self.groups, id))
            .or_else(|| find_in(&self.channels, id))
    }

    /// Removes a placeholder item from view. Live items are never removed.
    pub fn dismiss_placeholder(&mut self, id: &str) -> bool {
        [&mut self.groups, &mut self.channels]
            .into_iter()
            .any(|collection| match collection {
                Sourced::Placeholder(items) => {
                    let before = items.len();
                    items.retain(|item| item.id != id);
                    items.len() != before
                }
                Sourced::Live(_) => false,
            })
    }
}

fn find_in<'a>(collection: &'a Collection, id: &str) -> Option<Sourced<&'a GroupOrChannel>> {
    let item = collection.data().iter().find(|item| item.id == id)?;
    Some(match collection {
        Sourced::Live(_) => Sourced::Live(item),
        Sourced::Placeholder(_) => Sourced::Placeholder(item),
    })
}

/// What the current user may do with a listed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ItemActions {
    pub can_join: bool,
    pub can_leave: bool,
    pub can_delete: bool,
    pub can_dismiss: bool,
}

pub fn actions_for(item: Sourced<&GroupOrChannel>, user: Option<&SessionUser>) -> ItemActions {
    match item {
        Sourced::Placeholder(_) => ItemActions {
            can_dismiss: true,
            ..ItemActions::default()
        },
        Sourced::Live(item) => match user {
            None => ItemActions::default(),
            Some(user) => {
                let member = item.is_member(&user.id);
                ItemActions {
                    can_join: !member,
                    can_leave: member,
                    can_delete: item.is_admin(user),
                    can_dismiss: false,
                }
            }
        },
    }
}

//! Page-by-page feed reading.
//!
//! Feeds carry no total or has-more flag. A page shorter than
//! [`PAGE_SIZE`] is the last one; an empty page means the previous page was.

use store::{Article, PAGE_SIZE};

use crate::{BlogClient, ClientResult};

/// A paginated feed the server exposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feed {
    Global,
    Following,
    My,
    Author(String),
    Category(String),
    Search(String),
}

impl BlogClient {
    pub async fn feed(&self, feed: &Feed, page: u64) -> ClientResult<Vec<Article>> {
        match feed {
            Feed::Global => self.global_feed(page).await,
            Feed::Following => self.following_feed(page).await,
            Feed::My => self.my_feed(page).await,
            Feed::Author(username) => self.author_feed(username, page).await,
            Feed::Category(category) => self.category_feed(category, page).await,
            Feed::Search(query) => Ok(self.search(query, page).await?.articles),
        }
    }
}

fn is_last_page(len: usize) -> bool {
    (len as u64) < PAGE_SIZE
}

pub struct FeedPager<'a> {
    client: &'a BlogClient,
    feed: Feed,
    next: u64,
    exhausted: bool,
}

impl<'a> FeedPager<'a> {
    pub fn new(client: &'a BlogClient, feed: Feed) -> Self {
        Self {
            client,
            feed,
            next: 1,
            exhausted: false,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Number of the page the next call will request.
    pub fn next_page_number(&self) -> u64 {
        self.next
    }

    /// Fetch the next page, or `None` once the feed has run out.
    pub async fn next_page(&mut self) -> ClientResult<Option<Vec<Article>>> {
        if self.exhausted {
            return Ok(None);
        }
        let page = self.client.feed(&self.feed, self.next).await?;
        self.next += 1;
        if is_last_page(page.len()) {
            self.exhausted = true;
        }
        if page.is_empty() {
            return Ok(None);
        }
        Ok(Some(page))
    }

    /// Read every remaining page.
    pub async fn collect_all(mut self) -> ClientResult<Vec<Article>> {
        let mut articles = Vec::new();
        while let Some(page) = self.next_page().await? {
            articles.extend(page);
        }
        Ok(articles)
    }
}

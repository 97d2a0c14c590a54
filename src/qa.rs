//! Query orchestration.
//!
//! [`TutorService`] is the process-wide session service: constructed once
//! at startup from validated configuration (which is when missing
//! credentials fail), then shared read-only across queries. Each query runs
//! start-to-finish inside one [`TutorService::answer`] call: classify, then
//! either search for external videos or retrieve-dedup-prompt-generate.

use anyhow::Result;
use serde::Serialize;

use crate::config::Config;
use crate::embedding;
use crate::index::VectorIndex;
use crate::llm::ChatClient;
use crate::models::VideoLink;
use crate::prompt;
use crate::retrieve::{dedup_chunks, Retriever};
use crate::router::{self, QueryIntent};
use crate::video_search::{VideoSearch, VideoSearchOutcome};

/// The reply for one user turn. `youtube_links` is `None` unless an
/// external-resource search found results.
#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub answer: String,
    pub youtube_links: Option<Vec<VideoLink>>,
}

pub struct TutorService {
    retriever: Retriever,
    chat: ChatClient,
    video: VideoSearch,
    dedup_prefix_len: usize,
}

impl TutorService {
    /// Build the service: chat client, embedding provider, index handle,
    /// and video search. Missing API keys or an unknown provider fail here.
    pub async fn new(config: &Config) -> Result<Self> {
        let chat = ChatClient::new(&config.llm)?;
        let provider = embedding::create_provider(&config.embedding)?;
        let index = VectorIndex::open(config).await?;
        let retriever = Retriever::new(
            index,
            config.embedding.clone(),
            provider,
            &config.retrieval,
        );
        let video = VideoSearch::new(&config.video_search);

        Ok(Self {
            retriever,
            chat,
            video,
            dedup_prefix_len: config.retrieval.dedup_prefix_len,
        })
    }

    /// Generate the session-opening greeting.
    pub async fn greeting(&self) -> Result<String> {
        self.chat.generate(prompt::GREETING_INSTRUCTION).await
    }

    /// Answer one user turn. Always yields a well-formed reply for
    /// renderable failures; only retrieval-level faults (index unreachable)
    /// surface as errors.
    pub async fn answer(&self, query: &str) -> Result<ChatReply> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Ok(ChatReply {
                answer: prompt::EMPTY_QUERY_REPLY.to_string(),
                youtube_links: None,
            });
        }

        match router::classify(trimmed) {
            QueryIntent::ExternalResource => {
                let outcome = self.video.search(trimmed).await;
                Ok(external_reply(trimmed, outcome))
            }
            QueryIntent::GroundedQa => self.answer_grounded(trimmed).await,
        }
    }

    async fn answer_grounded(&self, query: &str) -> Result<ChatReply> {
        let retrieved = self.retriever.retrieve(query).await?;
        let unique = dedup_chunks(retrieved, self.dedup_prefix_len);
        let prompt_text = prompt::compose(query, &unique);

        let answer = match self.chat.generate(&prompt_text).await {
            Ok(answer) => answer,
            // The reply stays renderable; the provider message rides along
            // for diagnosability.
            Err(e) => format!(
                "I ran into a problem while generating an answer ({}). Please try again in a moment.",
                e
            ),
        };

        Ok(ChatReply {
            answer,
            youtube_links: None,
        })
    }
}

/// Render the reply for an external-resource query from the search outcome.
fn external_reply(query: &str, outcome: VideoSearchOutcome) -> ChatReply {
    match outcome {
        VideoSearchOutcome::Found(links) => {
            let mut answer = String::from("Here are some videos that might help:\n");
            for link in &links {
                answer.push_str(&format!("- {} ({})\n", link.title, link.href));
            }
            answer.push_str("\nWould you like to explore any of these topics from your library?");
            ChatReply {
                answer,
                youtube_links: Some(links),
            }
        }
        VideoSearchOutcome::Empty => ChatReply {
            answer: format!(
                "I couldn't find any matching videos just now. Try searching YouTube directly for \"{}\".",
                query
            ),
            youtube_links: None,
        },
        VideoSearchOutcome::Unavailable => ChatReply {
            answer: format!(
                "Video search is unavailable right now. Try searching YouTube manually for \"{}\".",
                query
            ),
            youtube_links: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(title: &str, href: &str) -> VideoLink {
        VideoLink {
            title: title.to_string(),
            href: href.to_string(),
        }
    }

    #[test]
    fn found_links_land_in_reply() {
        let links = vec![link("Backprop explained", "https://www.youtube.com/watch?v=a")];
        let reply = external_reply("youtube backprop", VideoSearchOutcome::Found(links.clone()));
        assert_eq!(reply.youtube_links, Some(links));
        assert!(reply.answer.contains("Backprop explained"));
    }

    #[test]
    fn empty_outcome_suggests_manual_search_with_query_text() {
        let reply = external_reply("youtube tutorials on CNNs", VideoSearchOutcome::Empty);
        assert!(reply.answer.contains("\"youtube tutorials on CNNs\""));
        assert!(reply.youtube_links.is_none());
    }

    #[test]
    fn unavailable_outcome_suggests_manual_search_with_query_text() {
        let reply = external_reply("youtube tutorials on CNNs", VideoSearchOutcome::Unavailable);
        assert!(reply.answer.contains("\"youtube tutorials on CNNs\""));
        assert!(reply.youtube_links.is_none());
    }

    #[test]
    fn reply_serializes_links_as_null_when_absent() {
        let reply = ChatReply {
            answer: "hi".to_string(),
            youtube_links: None,
        };
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["youtube_links"], serde_json::Value::Null);
    }
}

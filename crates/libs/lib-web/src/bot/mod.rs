//! # Bot Auto-Reply
//!
//! Generates replies for bot accounts participating in conversations.
//!
//! When a human sends a message into a direct conversation whose other
//! participant is a bot,
//! the message handler calls [`BotReplier::trigger_reply`], which spawns a
//! background task so the sender's request never waits on generation.
//! Replies within one conversation are serialized through a per-conversation
//! async mutex; concurrent sends produce one reply each, in order, never
//! interleaved generations.
//!
//! Generation uses the `genai` crate behind the `ai-bot` feature. Without
//! the feature, or when the provider call fails, the bot falls back to a
//! canned reply so the conversation never dead-ends.

use crate::realtime::{Fanout, RealtimeEvent};
use lib_core::model::store::models::{BotPersona, User, UserKind};
use lib_core::model::store::{ConversationRepository, MessageRepository, UserRepository};
use lib_core::DbPool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Reply used when generation is unavailable or fails.
pub const FALLBACK_REPLY: &str =
    "Sorry, I can't come up with a reply right now. Ask me again in a moment.";

/// How many recent messages feed the generation context.
const CONTEXT_WINDOW: usize = 20;

/// How many persona quotes are sampled into the system prompt.
const MAX_SAMPLED_QUOTES: usize = 15;

/// Delay before a bot's greeting lands in a freshly created conversation,
/// so the client has time to open its socket and render the conversation.
const INITIAL_MESSAGE_DELAY_MS: u64 = 1000;

/// Drives bot replies. One instance per server, shared via `AppState`.
pub struct BotReplier {
    db: DbPool,
    fanout: Fanout,
    locks: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl BotReplier {
    pub fn new(db: DbPool, fanout: Fanout) -> Arc<Self> {
        Arc::new(Self {
            db,
            fanout,
            locks: Mutex::new(HashMap::new()),
        })
    }

    /// Kick off a reply for a conversation if a bot participates and the
    /// trigger didn't come from a bot itself. Returns immediately.
    pub fn trigger_reply(self: &Arc<Self>, conversation_id: i64, sender_id: i64) {
        let replier = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(err) = replier.reply_once(conversation_id, sender_id).await {
                warn!(
                    "[BOT] Reply failed for conversation {}: {}",
                    conversation_id, err
                );
            }
        });
    }

    /// Post the bot's greeting into a newly created conversation after a
    /// short deliberate delay (an instant first message reads as canned).
    /// The caller awaits this, so the creation response already carries the
    /// greeting. No-op when the persona has no initial message.
    pub async fn post_initial_message(&self, conversation_id: i64, bot: User) -> anyhow::Result<()> {
        let persona = match bot.kind() {
            UserKind::Bot(persona) => persona,
            UserKind::Human => return Ok(()),
        };
        let Some(greeting) = persona.initial_message else {
            return Ok(());
        };

        tokio::time::sleep(std::time::Duration::from_millis(INITIAL_MESSAGE_DELAY_MS)).await;

        let lock = self.conversation_lock(conversation_id).await;
        let _guard = lock.lock().await;

        self.post_bot_message(conversation_id, bot.id, &greeting)
            .await
    }

    /// Produce exactly one reply, holding the conversation lock across
    /// context load, generation and insert.
    pub async fn reply_once(&self, conversation_id: i64, sender_id: i64) -> anyhow::Result<()> {
        let Some(bot) = self.find_bot_participant(conversation_id).await? else {
            return Ok(());
        };
        // Bots never answer themselves or each other
        if bot.id == sender_id {
            return Ok(());
        }
        let sender = UserRepository::find_by_id(&self.db, sender_id).await?;
        if sender.map(|u| u.is_bot).unwrap_or(false) {
            return Ok(());
        }

        let persona = match bot.kind() {
            UserKind::Bot(persona) => persona,
            UserKind::Human => return Ok(()),
        };

        let lock = self.conversation_lock(conversation_id).await;
        let _guard = lock.lock().await;

        let history =
            MessageRepository::list_for_participant(&self.db, conversation_id, bot.id).await?;
        let context_start = history.len().saturating_sub(CONTEXT_WINDOW);
        let context = &history[context_start..];

        let text = match generate(&persona, bot.id, context).await {
            Ok(text) => text,
            Err(err) => {
                debug!("[BOT] Generation unavailable, using fallback: {}", err);
                FALLBACK_REPLY.to_string()
            }
        };

        self.post_bot_message(conversation_id, bot.id, &text).await?;
        info!("[BOT] {} replied in conversation {}", bot.username, conversation_id);
        Ok(())
    }

    /// Insert the bot's message and fan it out to the conversation room.
    async fn post_bot_message(
        &self,
        conversation_id: i64,
        bot_id: i64,
        text: &str,
    ) -> anyhow::Result<()> {
        let message =
            MessageRepository::create(&self.db, conversation_id, bot_id, text, None).await?;

        self.fanout
            .publish_to_room(
                conversation_id,
                &RealtimeEvent::MessageReceive { message },
                Some(bot_id),
            )
            .await;
        Ok(())
    }

    /// Find the replying bot for a conversation, if there is one.
    ///
    /// Auto-replies only run in direct conversations with exactly one bot
    /// participant; groups and multi-bot rooms yield `None`.
    pub async fn find_bot_participant(
        &self,
        conversation_id: i64,
    ) -> anyhow::Result<Option<User>> {
        let participants = ConversationRepository::participants(&self.db, conversation_id).await?;
        let mut bots = participants.iter().filter(|p| p.is_bot);
        let Some(bot) = bots.next() else {
            return Ok(None);
        };
        if bots.next().is_some() {
            return Ok(None);
        }

        let conversation =
            ConversationRepository::get_for_participant(&self.db, conversation_id, bot.user_id)
                .await?;
        if conversation.is_group {
            return Ok(None);
        }

        Ok(UserRepository::find_by_id(&self.db, bot.user_id).await?)
    }

    async fn conversation_lock(&self, conversation_id: i64) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(locks.entry(conversation_id).or_default())
    }
}

/// Assemble the system prompt from the persona: base prompt plus a sample
/// of its quotes as stylistic seasoning.
#[cfg_attr(not(feature = "ai-bot"), allow(dead_code))]
fn build_system_prompt(persona: &BotPersona) -> String {
    use rand::seq::SliceRandom;

    let mut prompt = persona.system_prompt.clone();
    if !persona.quotes.is_empty() {
        let mut rng = rand::thread_rng();
        let sampled: Vec<&String> = persona
            .quotes
            .choose_multiple(&mut rng, MAX_SAMPLED_QUOTES.min(persona.quotes.len()))
            .collect();
        prompt.push_str("\n\nLines you like to quote when they fit:\n");
        for quote in sampled {
            prompt.push_str("- ");
            prompt.push_str(quote);
            prompt.push('\n');
        }
    }
    prompt
}

/// Generate a reply with the configured provider.
#[cfg(feature = "ai-bot")]
async fn generate(
    persona: &BotPersona,
    bot_id: i64,
    context: &[lib_core::model::store::models::MessageWithSender],
) -> anyhow::Result<String> {
    use genai::chat::{ChatMessage, ChatOptions, ChatRequest};
    use genai::Client;

    let model = std::env::var("AI_MODEL").unwrap_or_else(|_| "deepseek-chat".to_string());

    let client = Client::default();

    let mut chat_req = ChatRequest::default().with_system(build_system_prompt(persona));
    for message in context {
        if message.text.is_empty() {
            continue;
        }
        if message.sender_id == bot_id {
            chat_req = chat_req.append_message(ChatMessage::assistant(&message.text));
        } else {
            chat_req = chat_req.append_message(ChatMessage::user(&message.text));
        }
    }

    let chat_options = ChatOptions::default().with_temperature(0.8).with_max_tokens(500);

    let chat_res = client
        .exec_chat(&model, chat_req, Some(&chat_options))
        .await
        .map_err(|e| anyhow::anyhow!("AI API error: {:?}", e))?;

    let text = chat_res
        .first_text()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| anyhow::anyhow!("Empty response from AI"))?;

    Ok(text)
}

/// Without the `ai-bot` feature every generation attempt fails, which the
/// caller turns into [`FALLBACK_REPLY`].
#[cfg(not(feature = "ai-bot"))]
async fn generate(
    _persona: &BotPersona,
    _bot_id: i64,
    _context: &[lib_core::model::store::models::MessageWithSender],
) -> anyhow::Result<String> {
    Err(anyhow::anyhow!("AI replies are not enabled (ai-bot feature)"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_bot, seed_user, setup_test_db};

    #[tokio::test]
    async fn test_reply_falls_back_without_generation() {
        let pool = setup_test_db().await;
        let fanout = Fanout::new();
        let alice = seed_user(&pool, "alice").await;
        let bot = seed_bot(&pool, "quotebot", Some("Hello!")).await;
        let (conversation, _) =
            ConversationRepository::create(&pool, alice.id, &[bot.id], None, false)
                .await
                .unwrap();
        MessageRepository::create(&pool, conversation.id, alice.id, "hi bot", None)
            .await
            .unwrap();

        let replier = BotReplier::new(pool.clone(), fanout.clone());
        let mut rx = fanout.join_room(conversation.id).await;

        replier.reply_once(conversation.id, alice.id).await.unwrap();

        let history = MessageRepository::list_for_participant(&pool, conversation.id, alice.id)
            .await
            .unwrap();
        assert_eq!(history.len(), 2);
        let reply = &history[1];
        assert_eq!(reply.sender_id, bot.id);
        assert_eq!(reply.text, FALLBACK_REPLY);

        // The room got the realtime event, marked to skip the bot itself
        let frame = rx.recv().await.unwrap();
        assert!(frame.payload.contains("message:receive"));
        assert!(frame.payload.contains(FALLBACK_REPLY));
        assert_eq!(frame.exclude, Some(bot.id));
    }

    #[tokio::test]
    async fn test_initial_message_posted_after_delay() {
        let pool = setup_test_db().await;
        let alice = seed_user(&pool, "alice").await;
        let bot = seed_bot(&pool, "quotebot", Some("Hello! Ask me anything.")).await;
        let (conversation, _) =
            ConversationRepository::create(&pool, alice.id, &[bot.id], None, false)
                .await
                .unwrap();

        let replier = BotReplier::new(pool.clone(), Fanout::new());
        replier
            .post_initial_message(conversation.id, bot.clone())
            .await
            .unwrap();

        let history = MessageRepository::list_for_participant(&pool, conversation.id, alice.id)
            .await
            .unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].sender_id, bot.id);
        assert_eq!(history[0].text, "Hello! Ask me anything.");
    }

    #[tokio::test]
    async fn test_no_initial_message_configured_is_noop() {
        let pool = setup_test_db().await;
        let alice = seed_user(&pool, "alice").await;
        let bot = seed_bot(&pool, "quotebot", None).await;
        let (conversation, _) =
            ConversationRepository::create(&pool, alice.id, &[bot.id], None, false)
                .await
                .unwrap();

        let replier = BotReplier::new(pool.clone(), Fanout::new());
        replier
            .post_initial_message(conversation.id, bot)
            .await
            .unwrap();

        let history = MessageRepository::list_for_participant(&pool, conversation.id, alice.id)
            .await
            .unwrap();
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_bot_does_not_reply_to_itself() {
        let pool = setup_test_db().await;
        let alice = seed_user(&pool, "alice").await;
        let bot = seed_bot(&pool, "quotebot", None).await;
        let (conversation, _) =
            ConversationRepository::create(&pool, alice.id, &[bot.id], None, false)
                .await
                .unwrap();
        MessageRepository::create(&pool, conversation.id, bot.id, "I speak first", None)
            .await
            .unwrap();

        let replier = BotReplier::new(pool.clone(), Fanout::new());
        replier.reply_once(conversation.id, bot.id).await.unwrap();

        let history = MessageRepository::list_for_participant(&pool, conversation.id, alice.id)
            .await
            .unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_group_with_bot_gets_no_reply() {
        let pool = setup_test_db().await;
        let alice = seed_user(&pool, "alice").await;
        let bob = seed_user(&pool, "bob").await;
        let bot = seed_bot(&pool, "quotebot", None).await;
        let (group, _) = ConversationRepository::create(
            &pool,
            alice.id,
            &[bob.id, bot.id],
            Some("Team".to_string()),
            true,
        )
        .await
        .unwrap();
        MessageRepository::create(&pool, group.id, alice.id, "hello all", None)
            .await
            .unwrap();

        let replier = BotReplier::new(pool.clone(), Fanout::new());
        replier.reply_once(group.id, alice.id).await.unwrap();

        let history = MessageRepository::list_for_participant(&pool, group.id, alice.id)
            .await
            .unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_no_bot_participant_is_noop() {
        let pool = setup_test_db().await;
        let alice = seed_user(&pool, "alice").await;
        let bob = seed_user(&pool, "bob").await;
        let (conversation, _) =
            ConversationRepository::create(&pool, alice.id, &[bob.id], None, false)
                .await
                .unwrap();
        MessageRepository::create(&pool, conversation.id, alice.id, "hello", None)
            .await
            .unwrap();

        let replier = BotReplier::new(pool.clone(), Fanout::new());
        replier.reply_once(conversation.id, alice.id).await.unwrap();

        let history = MessageRepository::list_for_participant(&pool, conversation.id, bob.id)
            .await
            .unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_triggers_each_produce_one_reply() {
        let pool = setup_test_db().await;
        let alice = seed_user(&pool, "alice").await;
        let bot = seed_bot(&pool, "quotebot", None).await;
        let (conversation, _) =
            ConversationRepository::create(&pool, alice.id, &[bot.id], None, false)
                .await
                .unwrap();
        MessageRepository::create(&pool, conversation.id, alice.id, "one", None)
            .await
            .unwrap();
        MessageRepository::create(&pool, conversation.id, alice.id, "two", None)
            .await
            .unwrap();

        let replier = BotReplier::new(pool.clone(), Fanout::new());
        let (first, second) = tokio::join!(
            replier.reply_once(conversation.id, alice.id),
            replier.reply_once(conversation.id, alice.id),
        );
        first.unwrap();
        second.unwrap();

        let history = MessageRepository::list_for_participant(&pool, conversation.id, alice.id)
            .await
            .unwrap();
        // 2 human messages + exactly 2 bot replies
        assert_eq!(history.len(), 4);
        assert_eq!(history.iter().filter(|m| m.sender_id == bot.id).count(), 2);
    }

    #[test]
    fn test_system_prompt_includes_quotes() {
        let persona = BotPersona {
            system_prompt: "You are terse.".to_string(),
            quotes: vec!["less is more".to_string()],
            initial_message: None,
        };
        let prompt = build_system_prompt(&persona);
        assert!(prompt.starts_with("You are terse."));
        assert!(prompt.contains("less is more"));
    }

    #[test]
    fn test_system_prompt_without_quotes_is_bare() {
        let persona = BotPersona {
            system_prompt: "You are terse.".to_string(),
            quotes: vec![],
            initial_message: None,
        };
        assert_eq!(build_system_prompt(&persona), "You are terse.");
    }
}

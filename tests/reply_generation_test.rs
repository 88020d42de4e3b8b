mod common;

use std::sync::Arc;
use std::time::Duration;

use helpdesk_rag::adapters::memory::{
    InMemoryAiConfigRepository, InMemoryConversationStore, RecordingReplySink,
};
use helpdesk_rag::domain::errors::RagError;
use helpdesk_rag::domain::models::{
    AiModelConfig, BackgroundConfig, ChatMessage, ChatMode, Conversation, ConversationType,
    MessageType, ModelType, PublishStatus, DEFAULT_FALLBACK_REPLY,
};
use helpdesk_rag::domain::ports::SecretCipher;
use helpdesk_rag::infrastructure::credentials::AesGcmCipher;
use helpdesk_rag::services::{
    AiResponseOrchestrator, AutoReplyService, BackgroundExecutor, OrchestratorSettings,
};

use common::{document, knowledge_base, Harness, ScriptedLanguageModel, TEST_ENCRYPTION_KEY};

const AGENT_ID: u64 = 3;
const CONVERSATION_ID: u64 = 10;
const API_KEY: &str = "sk-live-abcdef123456";

struct Fixture {
    conversations: Arc<InMemoryConversationStore>,
    configs: Arc<InMemoryAiConfigRepository>,
    cipher: Arc<AesGcmCipher>,
    model: Arc<ScriptedLanguageModel>,
}

impl Fixture {
    fn new(model: ScriptedLanguageModel) -> Self {
        let fixture = Self {
            conversations: Arc::new(InMemoryConversationStore::new()),
            configs: Arc::new(InMemoryAiConfigRepository::new()),
            cipher: Arc::new(AesGcmCipher::new(TEST_ENCRYPTION_KEY).unwrap()),
            model: Arc::new(model),
        };
        fixture.conversations.insert_conversation(conversation(ChatMode::Ai, None));
        fixture
    }

    fn add_config(&self, id: u64, model_type: ModelType, is_active: bool) {
        self.configs.insert(AiModelConfig {
            id,
            user_id: AGENT_ID,
            provider: "openai".to_string(),
            api_url: "https://llm.example.com/v1/chat/completions".to_string(),
            api_key: self.cipher.encrypt(API_KEY).unwrap(),
            model: "gpt-4o-mini".to_string(),
            model_type,
            is_active,
            is_public: false,
            adapter_config: None,
        });
    }

    fn orchestrator(&self, settings: OrchestratorSettings) -> AiResponseOrchestrator {
        AiResponseOrchestrator::new(
            self.conversations.clone(),
            self.conversations.clone(),
            self.configs.clone(),
            self.cipher.clone(),
            self.model.clone(),
            settings,
        )
    }
}

fn conversation(chat_mode: ChatMode, ai_config_id: Option<u64>) -> Conversation {
    Conversation {
        id: CONVERSATION_ID,
        conversation_type: ConversationType::Visitor,
        agent_id: AGENT_ID,
        chat_mode,
        ai_config_id,
    }
}

fn visitor_message(id: u64, content: &str) -> ChatMessage {
    ChatMessage {
        id,
        conversation_id: CONVERSATION_ID,
        sender_id: 900,
        sender_is_agent: false,
        content: content.to_string(),
        message_type: MessageType::UserMessage,
    }
}

#[tokio::test]
async fn test_reply_is_grounded_in_retrieved_passages() {
    let fixture = Fixture::new(ScriptedLanguageModel::replying("Refunds go back to your card."));
    fixture.add_config(1, ModelType::Text, true);

    let harness = Harness::with_hashing(256);
    harness.knowledge_bases.insert(knowledge_base(1, true));
    harness
        .index(document(1, 1, "Refunds are issued to the original card", PublishStatus::Published))
        .await;
    let retrieval = Arc::new(harness.retrieval(Duration::ZERO));

    let orchestrator = fixture
        .orchestrator(OrchestratorSettings::default())
        .with_retriever(retrieval);
    let reply = orchestrator
        .generate_reply(CONVERSATION_ID, "How are refunds issued?", AGENT_ID)
        .await
        .unwrap();

    assert_eq!(reply, "Refunds go back to your card.");
    let requests = fixture.model.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].api_key, API_KEY);
    assert_eq!(requests[0].model, "gpt-4o-mini");
    assert!(requests[0]
        .message
        .contains("Passage 1:\nRefunds are issued to the original card"));
    assert!(requests[0].message.contains("User question: How are refunds issued?"));
}

#[tokio::test]
async fn test_history_is_bounded_and_skips_system_messages() {
    let fixture = Fixture::new(ScriptedLanguageModel::replying("ok"));
    fixture.add_config(1, ModelType::Text, true);
    for id in 1..=12 {
        fixture
            .conversations
            .push_message(visitor_message(id, &format!("message {id}")));
    }
    let mut notice = visitor_message(13, "Agent joined the chat");
    notice.message_type = MessageType::SystemMessage;
    fixture.conversations.push_message(notice);

    let settings = OrchestratorSettings {
        history_limit: 4,
        ..OrchestratorSettings::default()
    };
    fixture
        .orchestrator(settings)
        .generate_reply(CONVERSATION_ID, "hello", AGENT_ID)
        .await
        .unwrap();

    let request = &fixture.model.requests()[0];
    let history: Vec<&str> = request.history.iter().map(|turn| turn.content.as_str()).collect();
    assert_eq!(history, vec!["message 10", "message 11", "message 12"]);
    assert_eq!(request.message, "hello");
}

#[tokio::test]
async fn test_slow_model_yields_fallback_reply() {
    let fixture = Fixture::new(
        ScriptedLanguageModel::replying("too late").with_delay(Duration::from_millis(500)),
    );
    fixture.add_config(1, ModelType::Text, true);

    let settings = OrchestratorSettings {
        timeout: Duration::from_millis(50),
        ..OrchestratorSettings::default()
    };
    let reply = fixture
        .orchestrator(settings)
        .generate_reply(CONVERSATION_ID, "hello", AGENT_ID)
        .await
        .unwrap();

    assert_eq!(reply, DEFAULT_FALLBACK_REPLY);
}

#[tokio::test]
async fn test_model_failure_and_unsupported_type_yield_fallback() {
    let failing = Fixture::new(ScriptedLanguageModel::failing());
    failing.add_config(1, ModelType::Text, true);
    let reply = failing
        .orchestrator(OrchestratorSettings::default())
        .generate_reply(CONVERSATION_ID, "hello", AGENT_ID)
        .await
        .unwrap();
    assert_eq!(reply, DEFAULT_FALLBACK_REPLY);

    let image = Fixture::new(ScriptedLanguageModel::replying("unused"));
    image.conversations.insert_conversation(conversation(ChatMode::Ai, Some(2)));
    image.add_config(2, ModelType::Image, true);
    let reply = image
        .orchestrator(OrchestratorSettings::default())
        .generate_reply(CONVERSATION_ID, "draw a cat", AGENT_ID)
        .await
        .unwrap();
    assert_eq!(reply, DEFAULT_FALLBACK_REPLY);
    assert!(image.model.requests().is_empty());
}

#[tokio::test]
async fn test_configuration_errors_are_returned() {
    let missing = Fixture::new(ScriptedLanguageModel::replying("unused"));
    let err = missing
        .orchestrator(OrchestratorSettings::default())
        .generate_reply(CONVERSATION_ID, "hello", AGENT_ID)
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::NoConfigurationFound(_)));

    let disabled = Fixture::new(ScriptedLanguageModel::replying("unused"));
    disabled.conversations.insert_conversation(conversation(ChatMode::Ai, Some(8)));
    disabled.add_config(8, ModelType::Text, false);
    let err = disabled
        .orchestrator(OrchestratorSettings::default())
        .generate_reply(CONVERSATION_ID, "hello", AGENT_ID)
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::ConfigurationDisabled(8)));
}

#[tokio::test]
async fn test_auto_reply_delivers_generated_text() {
    let fixture = Fixture::new(ScriptedLanguageModel::replying("Happy to help!"));
    fixture.add_config(1, ModelType::Text, true);
    let sink = Arc::new(RecordingReplySink::new());
    let executor = Arc::new(BackgroundExecutor::new(&BackgroundConfig::default()));
    let service = AutoReplyService::new(
        Arc::new(fixture.orchestrator(OrchestratorSettings::default())),
        sink.clone(),
        executor.clone(),
    );

    let handle = service
        .schedule(&conversation(ChatMode::Ai, None), &visitor_message(1, "hi"))
        .await
        .unwrap();
    assert!(handle.is_some());

    executor.shutdown().await;
    let replies = sink.replies();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].conversation_id, CONVERSATION_ID);
    assert_eq!(replies[0].content, "Happy to help!");
    assert_eq!(executor.stats().succeeded, 1);
}

#[tokio::test]
async fn test_auto_reply_skips_human_mode_and_falls_back_without_config() {
    let fixture = Fixture::new(ScriptedLanguageModel::replying("unused"));
    let sink = Arc::new(RecordingReplySink::new());
    let executor = Arc::new(BackgroundExecutor::new(&BackgroundConfig::default()));
    let service = AutoReplyService::new(
        Arc::new(fixture.orchestrator(OrchestratorSettings::default())),
        sink.clone(),
        executor.clone(),
    );

    let skipped = service
        .schedule(&conversation(ChatMode::Human, None), &visitor_message(1, "hi"))
        .await
        .unwrap();
    assert!(skipped.is_none());

    service
        .reply_now(&conversation(ChatMode::Ai, None), &visitor_message(2, "hi"))
        .await
        .unwrap();
    let replies = sink.replies();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].content, DEFAULT_FALLBACK_REPLY);
    assert!(fixture.model.requests().is_empty());

    executor.shutdown().await;
}

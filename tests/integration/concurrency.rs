use super::{
    closed_port_url, create_test_config, create_test_state, mount_gemini_reply, Arc,
};
use talking_agent::{
    storage::init_db, ConversationRepository, NewMessage, SeaOrmConversationRepository,
    VoiceRequest,
};
use wiremock::MockServer;

#[tokio::test]
async fn test_concurrent_get_or_create_yields_one_conversation() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("race.db").display());
    let repo = Arc::new(SeaOrmConversationRepository::new(
        init_db(&url, 5).await.unwrap(),
    ));

    let mut handles = Vec::new();
    for _ in 0..10 {
        let repo = repo.clone();
        handles.push(tokio::spawn(
            async move { repo.get_or_create("shared").await },
        ));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().unwrap().id);
    }

    ids.dedup();
    assert_eq!(ids.len(), 1);
}

#[tokio::test]
async fn test_concurrent_appends_are_all_stored() {
    let repo = Arc::new(SeaOrmConversationRepository::new(
        init_db("sqlite::memory:", 1).await.unwrap(),
    ));
    let conversation = repo.get_or_create("busy").await.unwrap();

    let mut handles = Vec::new();
    for i in 0..20 {
        let repo = repo.clone();
        let id = conversation.id;
        handles.push(tokio::spawn(async move {
            repo.append_message(id, NewMessage::user(format!("msg {}", i)))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(
        repo.count_messages_in_conversation(conversation.id)
            .await
            .unwrap(),
        20
    );
}

#[tokio::test]
async fn test_concurrent_utterances_across_sessions() {
    let gemini = MockServer::start().await;
    mount_gemini_reply(&gemini, "Got it.").await;

    let state = create_test_state(create_test_config(&gemini.uri(), &closed_port_url())).await;

    let mut handles = Vec::new();
    for i in 0..6 {
        let orchestrator = state.orchestrator.clone();
        handles.push(tokio::spawn(async move {
            orchestrator
                .process_utterance(VoiceRequest::new(
                    format!("hello {}", i),
                    Some(format!("session-{}", i % 3)),
                ))
                .await
        }));
    }

    for handle in handles {
        let exchange = handle.await.unwrap().unwrap();
        assert_eq!(exchange.agent_response, "Got it.");
    }

    for i in 0..3 {
        let conversation = state
            .repo
            .find_by_session(&format!("session-{}", i))
            .await
            .unwrap()
            .unwrap();
        let count = state
            .repo
            .count_messages_in_conversation(conversation.id)
            .await
            .unwrap();
        assert_eq!(count, 4);
    }
}

diesel::table! {
    conversations (id) {
        id -> Uuid,
        user1_id -> Uuid,
        user2_id -> Uuid,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    messages (id) {
        id -> Uuid,
        conversation_id -> Uuid,
        sender_id -> Uuid,
        #[max_length = 10]
        kind -> Varchar,
        content -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    date_invites (id) {
        id -> Uuid,
        conversation_id -> Uuid,
        sender_id -> Uuid,
        #[max_length = 10]
        status -> Varchar,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    date_preferences (id) {
        id -> Uuid,
        conversation_id -> Uuid,
        user_id -> Uuid,
        moments -> Array<Text>,
        activities -> Array<Text>,
        submitted_at -> Timestamptz,
    }
}

diesel::joinable!(messages -> conversations (conversation_id));
diesel::joinable!(date_invites -> conversations (conversation_id));
diesel::joinable!(date_preferences -> conversations (conversation_id));

diesel::allow_tables_to_appear_in_same_query!(
    conversations,
    messages,
    date_invites,
    date_preferences,
);

diesel::table! {
    notifications (id) {
        id -> Uuid,
        receiver_id -> Uuid,
        sender_id -> Uuid,
        #[max_length = 20]
        kind -> Varchar,
        context -> Text,
        is_read -> Bool,
        created_at -> Timestamptz,
    }
}

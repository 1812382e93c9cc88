diesel::table! {
    users (id) {
        id -> Uuid,
        #[max_length = 50]
        username -> Varchar,
        #[max_length = 255]
        email -> Varchar,
        is_online -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    profiles (id) {
        id -> Uuid,
        user_id -> Uuid,
        #[max_length = 10]
        gender -> Varchar,
        #[max_length = 20]
        sexual_preference -> Varchar,
        birthday -> Nullable<Date>,
        interests -> Nullable<Text>,
        fame_rating -> Int4,
        has_main_picture -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    locations (id) {
        id -> Uuid,
        user_id -> Uuid,
        latitude -> Float8,
        longitude -> Float8,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    likes (id) {
        id -> Uuid,
        liker_id -> Uuid,
        liked_id -> Uuid,
        unliked -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    blocks (id) {
        id -> Uuid,
        blocker_id -> Uuid,
        blocked_id -> Uuid,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(profiles -> users (user_id));
diesel::joinable!(locations -> users (user_id));

diesel::allow_tables_to_appear_in_same_query!(users, profiles, locations, likes, blocks);

table! {
    users (id) {
        id -> BigInt,
        username -> Text,
        is_administrator -> Bool,
    }
}

table! {
    items (id) {
        id -> BigInt,
        parent_id -> Nullable<BigInt>,

        name -> Text,
        path -> Text,
        kind -> Integer,
        mime_type -> Text,

        views -> BigInt,
        created_at -> Timestamp,
        created_by -> Nullable<BigInt>,
        file_mod_time -> Timestamp,
    }
}

table! {
    item_accessibilities (id) {
        id -> BigInt,
        item_id -> BigInt,
        user_id -> BigInt,
        accessible -> Bool,
    }
}

table! {
    item_ratings (id) {
        id -> BigInt,
        item_id -> BigInt,
        user_id -> BigInt,
        rating -> Integer,
    }
}

table! {
    suggestions (id) {
        id -> BigInt,
        from_user_id -> BigInt,
        to_user_id -> BigInt,
        item_id -> BigInt,
        created_at -> Timestamp,
    }
}

allow_tables_to_appear_in_same_query!(
    users,
    items,
    item_accessibilities,
    item_ratings,
    suggestions,
);

joinable!(item_accessibilities -> items(item_id));
joinable!(item_accessibilities -> users(user_id));
joinable!(item_ratings -> items(item_id));
// Suggestions reference users twice, these joins must be done explicitly.
joinable!(suggestions -> items(item_id));

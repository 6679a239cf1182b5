table! {
    parties (id) {
        id -> Uuid,
        lead -> Nullable<Uuid>,
        name -> Text,
        sort_value -> Text,
        address -> Text,
        code_word -> Text,
    }
}

table! {
    people (id) {
        id -> Uuid,
        party -> Uuid,
        name -> Text,
        email -> Nullable<Text>,
        gets_plus_one -> Bool,
        plus_one -> Nullable<Uuid>,
        is_plus_one -> Bool,
        is_plus_one_of -> Nullable<Uuid>,
        replied -> Bool,
        attending -> Bool,
        dietary_restrictions -> Text,
        song_request -> Text,
        is_child -> Bool,
        will_accompany -> Nullable<Uuid>,
        activities -> Jsonb,
    }
}

joinable!(people -> parties (party));

allow_tables_to_appear_in_same_query!(parties, people);

use barrel::backend::Pg;
use barrel::{types, Migration};

pub fn migration() -> String {
    let mut migr = Migration::new();

    migr.create_table("parties", |table| {
        table.add_column("id", types::uuid().primary(true));
        // no FK here: lead and people.party would be mutually referential
        table.add_column("lead", types::uuid().nullable(true));
        table.add_column("name", types::varchar(255).nullable(false));
        table.add_column("sort_value", types::varchar(255).nullable(false));
        table.add_column("address", types::text().nullable(false));
        table.add_column("code_word", types::varchar(255).nullable(false).indexed(true));
    });

    migr.create_table("people", |table| {
        table.add_column("id", types::uuid().primary(true));
        table.add_column("party", types::custom("UUID NOT NULL REFERENCES parties(id)"));
        table.add_column("name", types::varchar(255).nullable(false));
        table.add_column("email", types::varchar(255).nullable(true));
        table.add_column("gets_plus_one", types::boolean().nullable(false));
        table.add_column("plus_one", types::uuid().nullable(true));
        table.add_column("is_plus_one", types::boolean().nullable(false));
        table.add_column("is_plus_one_of", types::uuid().nullable(true));
        table.add_column("replied", types::boolean().nullable(false));
        table.add_column("attending", types::boolean().nullable(false));
        table.add_column("dietary_restrictions", types::text().nullable(false));
        table.add_column("song_request", types::text().nullable(false));
        table.add_column("is_child", types::boolean().nullable(false));
        table.add_column("will_accompany", types::uuid().nullable(true));
        table.add_column(
            "activities",
            types::custom("JSONB NOT NULL DEFAULT '{}'::jsonb"),
        );
    });

    // A plus-one slot can hold at most one claimant; concurrent claims on the
    // same sponsor fail here instead of racing past the consistency check.
    migr.inject_custom(
        "CREATE UNIQUE INDEX people_unique_plus_one_slot \
         ON people (is_plus_one_of) WHERE is_plus_one_of IS NOT NULL",
    );

    migr.make::<Pg>()
}

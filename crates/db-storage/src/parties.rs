//! Contains the party specific database structs and queries
use crate::people::PersonId;
use crate::schema::parties;
use database::{DbConnection, Result};
use diesel::{ExpressionMethods, Identifiable, QueryDsl, Queryable, RunQueryDsl};

diesel_newtype! {
    #[derive(Copy)] PartyId(uuid::Uuid) => diesel::sql_types::Uuid
}

/// Diesel party struct
///
/// Represents an invitation group in the database. All members of a party
/// share its code word for self-service access.
#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = parties)]
pub struct Party {
    pub id: PartyId,
    pub lead: Option<PersonId>,
    pub name: String,
    pub sort_value: String,
    pub address: String,
    pub code_word: String,
}

impl Party {
    /// Returns the parties for the given ids, ordered by their sort value
    #[tracing::instrument(err, skip_all)]
    pub fn get(conn: &mut DbConnection, ids: &[PartyId]) -> Result<Vec<Party>> {
        let query = parties::table
            .filter(parties::id.eq_any(ids))
            .order(parties::sort_value.asc());

        let parties = query.load(conn)?;

        Ok(parties)
    }

    /// Returns all parties, ordered by their sort value
    #[tracing::instrument(err, skip_all)]
    pub fn get_all(conn: &mut DbConnection) -> Result<Vec<Party>> {
        let query = parties::table.order(parties::sort_value.asc());

        let parties = query.load(conn)?;

        Ok(parties)
    }

    /// Resolves a code word to the party holding it.
    ///
    /// Returns `None` when no party holds the word, and also when more than
    /// one party does; an ambiguous word must not grant access to any party.
    #[tracing::instrument(err, skip_all)]
    pub fn get_by_code_word(conn: &mut DbConnection, code_word: &str) -> Result<Option<Party>> {
        let query = parties::table
            .filter(parties::code_word.eq(code_word))
            .limit(2);

        let mut matches = query.load::<Party>(conn)?;

        if matches.len() == 1 {
            Ok(matches.pop())
        } else {
            Ok(None)
        }
    }
}

/// Diesel insertable party struct
///
/// Upserted by id; the stored values of an existing row are replaced wholesale.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = parties)]
pub struct UpsertParty {
    pub id: PartyId,
    pub lead: Option<PersonId>,
    pub name: String,
    pub sort_value: String,
    pub address: String,
    pub code_word: String,
}

impl UpsertParty {
    /// Inserts the given batch, updating rows whose id already exists
    #[tracing::instrument(err, skip_all, fields(batch_len = records.len()))]
    pub fn upsert_all(conn: &mut DbConnection, records: Vec<UpsertParty>) -> Result<Vec<Party>> {
        use diesel::upsert::excluded;

        let query = diesel::insert_into(parties::table)
            .values(records)
            .on_conflict(parties::id)
            .do_update()
            .set((
                parties::lead.eq(excluded(parties::lead)),
                parties::name.eq(excluded(parties::name)),
                parties::sort_value.eq(excluded(parties::sort_value)),
                parties::address.eq(excluded(parties::address)),
                parties::code_word.eq(excluded(parties::code_word)),
            ));

        let parties = query.get_results(conn)?;

        Ok(parties)
    }
}

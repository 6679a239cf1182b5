//! Contains the person specific database structs and queries
use crate::parties::PartyId;
use crate::schema::people;
use database::{DbConnection, Result};
use diesel::{ExpressionMethods, Identifiable, QueryDsl, Queryable, RunQueryDsl};

diesel_newtype! {
    #[derive(Copy)] PersonId(uuid::Uuid) => diesel::sql_types::Uuid
}

/// Diesel person struct
///
/// Represents a single invitee. The plus-one linkage works in both
/// directions: `gets_plus_one`/`plus_one` on the sponsor side,
/// `is_plus_one`/`is_plus_one_of` on the guest side. The RSVP answer fields
/// carry no cross-record invariants.
#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = people)]
pub struct Person {
    pub id: PersonId,
    pub party: PartyId,
    pub name: String,
    pub email: Option<String>,
    pub gets_plus_one: bool,
    pub plus_one: Option<PersonId>,
    pub is_plus_one: bool,
    pub is_plus_one_of: Option<PersonId>,
    pub replied: bool,
    pub attending: bool,
    pub dietary_restrictions: String,
    pub song_request: String,
    pub is_child: bool,
    pub will_accompany: Option<PersonId>,
    pub activities: serde_json::Value,
}

impl Person {
    /// Returns the people for the given ids
    #[tracing::instrument(err, skip_all)]
    pub fn get(conn: &mut DbConnection, ids: &[PersonId]) -> Result<Vec<Person>> {
        let query = people::table.filter(people::id.eq_any(ids));

        let people = query.load(conn)?;

        Ok(people)
    }

    /// Returns all people belonging to the given party
    #[tracing::instrument(err, skip_all)]
    pub fn get_for_party(conn: &mut DbConnection, party_id: PartyId) -> Result<Vec<Person>> {
        let query = people::table.filter(people::party.eq(party_id));

        let people = query.load(conn)?;

        Ok(people)
    }

    /// Returns all people
    #[tracing::instrument(err, skip_all)]
    pub fn get_all(conn: &mut DbConnection) -> Result<Vec<Person>> {
        let people = people::table.load(conn)?;

        Ok(people)
    }
}

/// Diesel insertable person struct
///
/// Upserted by id; the stored values of an existing row are replaced
/// wholesale. The partial unique index on `is_plus_one_of` rejects a second
/// claim on an occupied plus-one slot at commit time.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = people)]
pub struct UpsertPerson {
    pub id: PersonId,
    pub party: PartyId,
    pub name: String,
    pub email: Option<String>,
    pub gets_plus_one: bool,
    pub plus_one: Option<PersonId>,
    pub is_plus_one: bool,
    pub is_plus_one_of: Option<PersonId>,
    pub replied: bool,
    pub attending: bool,
    pub dietary_restrictions: String,
    pub song_request: String,
    pub is_child: bool,
    pub will_accompany: Option<PersonId>,
    pub activities: serde_json::Value,
}

impl UpsertPerson {
    /// Inserts the given batch, updating rows whose id already exists
    #[tracing::instrument(err, skip_all, fields(batch_len = records.len()))]
    pub fn upsert_all(conn: &mut DbConnection, records: Vec<UpsertPerson>) -> Result<Vec<Person>> {
        use diesel::upsert::excluded;

        let query = diesel::insert_into(people::table)
            .values(records)
            .on_conflict(people::id)
            .do_update()
            .set((
                people::party.eq(excluded(people::party)),
                people::name.eq(excluded(people::name)),
                people::email.eq(excluded(people::email)),
                people::gets_plus_one.eq(excluded(people::gets_plus_one)),
                people::plus_one.eq(excluded(people::plus_one)),
                people::is_plus_one.eq(excluded(people::is_plus_one)),
                people::is_plus_one_of.eq(excluded(people::is_plus_one_of)),
                people::replied.eq(excluded(people::replied)),
                people::attending.eq(excluded(people::attending)),
                people::dietary_restrictions.eq(excluded(people::dietary_restrictions)),
                people::song_request.eq(excluded(people::song_request)),
                people::is_child.eq(excluded(people::is_child)),
                people::will_accompany.eq(excluded(people::will_accompany)),
                people::activities.eq(excluded(people::activities)),
            ));

        let people = query.get_results(conn)?;

        Ok(people)
    }
}

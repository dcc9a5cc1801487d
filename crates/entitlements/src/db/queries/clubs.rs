use super::*;

#[derive(Debug)]
pub struct NewClubParams {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
}

impl Database {
    /// Creates a new club.
    pub async fn create_club(&self, params: &NewClubParams) -> Result<club::Model> {
        self.transaction(|tx| async move {
            let club = club::Entity::insert(club::ActiveModel {
                id: ActiveValue::set(params.id.clone()),
                name: ActiveValue::set(params.name.clone()),
                email: ActiveValue::set(params.email.clone()),
                ..Default::default()
            })
            .exec_with_returning(&*tx)
            .await?;

            Ok(club)
        })
        .await
    }

    /// Returns the club with the given ID.
    pub async fn get_club(&self, club_id: &str) -> Result<Option<club::Model>> {
        self.transaction(|tx| async move {
            Ok(club::Entity::find_by_id(club_id.to_string())
                .one(&*tx)
                .await?)
        })
        .await
    }
}

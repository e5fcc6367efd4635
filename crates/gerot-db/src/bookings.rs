use chrono::{NaiveDate, NaiveTime, Utc};
use gerot_core::TimeSlot;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    models::{BookingFilter, NewRoomBooking, RoomBookingRecord, RoomBookingUpdate},
    Database, Error, Result,
};

const BOOKING_SELECT: &str = r#"
    SELECT b.id, b.user_id, COALESCE(u.full_name, u.username) AS user_name,
           b.room, b.title, b.date, b.start_time, b.end_time, b.participants, b.subject,
           b.created_at, b.updated_at
    FROM room_bookings b
    JOIN users u ON u.id = b.user_id
"#;

fn validate(room: &str, title: &str, participants: i64, slot: Result<TimeSlot>) -> Result<TimeSlot> {
    if room.trim().is_empty() {
        return Err(Error::Validation("room is required".to_string()));
    }
    if title.trim().is_empty() {
        return Err(Error::Validation("booking title is required".to_string()));
    }
    if participants <= 0 {
        return Err(Error::Validation("participants must be positive".to_string()));
    }
    slot
}

/// Fails with `Conflict` when another active booking of the room overlaps `slot`.
async fn ensure_room_free(
    conn: &mut SqliteConnection,
    room: &str,
    date: NaiveDate,
    slot: TimeSlot,
    ignore: Option<i64>,
) -> Result<()> {
    let taken: Vec<(i64, NaiveTime, NaiveTime)> = sqlx::query_as(
        r#"
        SELECT id, start_time, end_time FROM room_bookings
        WHERE room = ? AND date = ? AND is_active = 1
        "#,
    )
    .bind(room)
    .bind(date)
    .fetch_all(&mut *conn)
    .await?;

    let clash = taken
        .into_iter()
        .filter(|(id, _, _)| Some(*id) != ignore)
        .find(|(_, start, end)| {
            slot.overlaps(&TimeSlot {
                start: *start,
                end: *end,
            })
        });

    match clash {
        Some((_, start, end)) => Err(Error::Conflict(format!(
            "{} is already booked on {} from {} to {}",
            room,
            date,
            start.format("%H:%M"),
            end.format("%H:%M")
        ))),
        None => Ok(()),
    }
}

impl Database {
    pub async fn create_booking(
        &self,
        user_id: i64,
        booking: &NewRoomBooking,
    ) -> Result<RoomBookingRecord> {
        let slot = validate(
            &booking.room,
            &booking.title,
            booking.participants,
            TimeSlot::new(booking.start_time, booking.end_time).map_err(Error::from),
        )?;
        let room = booking.room.trim();
        let now = Utc::now();

        let mut tx = self.pool().begin().await?;
        ensure_room_free(&mut tx, room, booking.date, slot, None).await?;

        let result = sqlx::query(
            r#"
            INSERT INTO room_bookings (
                user_id, room, title, date, start_time, end_time, participants, subject,
                is_active, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(room)
        .bind(booking.title.trim())
        .bind(booking.date)
        .bind(slot.start)
        .bind(slot.end)
        .bind(booking.participants)
        .bind(&booking.subject)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        let id = result.last_insert_rowid();
        tracing::info!(booking_id = id, room, date = %booking.date, "Room booked");
        self.get_booking(id)
            .await?
            .ok_or_else(|| Error::NotFound("booking".to_string()))
    }

    /// Active bookings only.
    pub async fn get_booking(&self, id: i64) -> Result<Option<RoomBookingRecord>> {
        let booking = sqlx::query_as::<_, RoomBookingRecord>(&format!(
            "{} WHERE b.id = ? AND b.is_active = 1",
            BOOKING_SELECT
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        Ok(booking)
    }

    /// Newest first.
    pub async fn list_bookings(&self, filter: &BookingFilter) -> Result<Vec<RoomBookingRecord>> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(BOOKING_SELECT);
        query.push(" WHERE b.is_active = 1");
        if let Some(room) = &filter.room {
            query.push(" AND b.room = ").push_bind(room.trim().to_string());
        }
        if let Some(date) = filter.date {
            query.push(" AND b.date = ").push_bind(date);
        }
        query.push(" ORDER BY b.date DESC, b.start_time DESC, b.id DESC");

        let bookings = query
            .build_query_as::<RoomBookingRecord>()
            .fetch_all(self.pool())
            .await?;
        Ok(bookings)
    }

    /// Re-validates the merged booking, including the overlap check against other bookings.
    pub async fn update_booking(
        &self,
        id: i64,
        update: &RoomBookingUpdate,
    ) -> Result<RoomBookingRecord> {
        let current = self
            .get_booking(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("booking {}", id)))?;

        let room = update.room.as_deref().unwrap_or(&current.room).trim().to_string();
        let title = update.title.as_deref().unwrap_or(&current.title).trim().to_string();
        let date = update.date.unwrap_or(current.date);
        let participants = update.participants.unwrap_or(current.participants);
        let slot = validate(
            &room,
            &title,
            participants,
            TimeSlot::new(
                update.start_time.unwrap_or(current.start_time),
                update.end_time.unwrap_or(current.end_time),
            )
            .map_err(Error::from),
        )?;

        let mut tx = self.pool().begin().await?;
        ensure_room_free(&mut tx, &room, date, slot, Some(id)).await?;

        sqlx::query(
            r#"
            UPDATE room_bookings
            SET room = ?, title = ?, date = ?, start_time = ?, end_time = ?,
                participants = ?, subject = COALESCE(?, subject), updated_at = ?
            WHERE id = ? AND is_active = 1
            "#,
        )
        .bind(&room)
        .bind(&title)
        .bind(date)
        .bind(slot.start)
        .bind(slot.end)
        .bind(participants)
        .bind(&update.subject)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        self.get_booking(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("booking {}", id)))
    }

    /// Soft delete; the slot becomes free again.
    pub async fn cancel_booking(&self, id: i64) -> Result<()> {
        let result = sqlx::query(
            "UPDATE room_bookings SET is_active = 0, updated_at = ? WHERE id = ? AND is_active = 1",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("booking {}", id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewUser;
    use gerot_core::Role;

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 20).unwrap()
    }

    fn booking(room: &str, start: NaiveTime, end: NaiveTime) -> NewRoomBooking {
        NewRoomBooking {
            room: room.to_string(),
            title: "Alinhamento semanal".to_string(),
            date: day(),
            start_time: start,
            end_time: end,
            participants: 6,
            subject: Some("Indicadores do CD".to_string()),
        }
    }

    async fn setup() -> (Database, i64) {
        let db = Database::in_memory().await.unwrap();
        let user = db
            .create_user(&NewUser {
                username: "marta".to_string(),
                email: None,
                password: None,
                full_name: Some("Marta Reis".to_string()),
                role: Role::Colaborador,
                sector_id: None,
            })
            .await
            .unwrap();
        (db, user.id)
    }

    #[tokio::test]
    async fn test_overlapping_booking_conflicts() {
        let (db, user_id) = setup().await;
        let first = db
            .create_booking(user_id, &booking("sala1", at(9, 0), at(10, 0)))
            .await
            .unwrap();
        assert_eq!(first.user_name.as_deref(), Some("Marta Reis"));
        assert_eq!(first.slot(), TimeSlot::new(at(9, 0), at(10, 0)).unwrap());

        let clash = db
            .create_booking(user_id, &booking("sala1", at(9, 30), at(10, 30)))
            .await;
        assert!(matches!(clash, Err(Error::Conflict(_))));

        // Back-to-back slots and other rooms are fine.
        db.create_booking(user_id, &booking("sala1", at(10, 0), at(11, 0)))
            .await
            .unwrap();
        db.create_booking(user_id, &booking("sala2", at(9, 0), at(10, 0)))
            .await
            .unwrap();

        let sala1 = db
            .list_bookings(&BookingFilter {
                room: Some("sala1".to_string()),
                date: Some(day()),
            })
            .await
            .unwrap();
        assert_eq!(sala1.len(), 2);
        assert_eq!(sala1[0].start_time, at(10, 0));
    }

    #[tokio::test]
    async fn test_booking_validation() {
        let (db, user_id) = setup().await;

        let backwards = db
            .create_booking(user_id, &booking("sala1", at(11, 0), at(10, 0)))
            .await;
        assert!(matches!(backwards, Err(Error::Domain(_))));

        let mut empty = booking("sala1", at(9, 0), at(10, 0));
        empty.participants = 0;
        assert!(matches!(
            db.create_booking(user_id, &empty).await,
            Err(Error::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_update_ignores_own_slot_and_cancel_frees_it() {
        let (db, user_id) = setup().await;
        let first = db
            .create_booking(user_id, &booking("sala1", at(9, 0), at(10, 0)))
            .await
            .unwrap();
        let second = db
            .create_booking(user_id, &booking("sala1", at(10, 0), at(11, 0)))
            .await
            .unwrap();

        let longer = db
            .update_booking(
                first.id,
                &RoomBookingUpdate {
                    start_time: Some(at(8, 30)),
                    participants: Some(8),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(longer.start_time, at(8, 30));
        assert_eq!(longer.participants, 8);

        let into_second = db
            .update_booking(
                first.id,
                &RoomBookingUpdate {
                    end_time: Some(at(10, 15)),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(into_second, Err(Error::Conflict(_))));

        db.cancel_booking(second.id).await.unwrap();
        assert!(db.get_booking(second.id).await.unwrap().is_none());
        assert!(matches!(
            db.cancel_booking(second.id).await,
            Err(Error::NotFound(_))
        ));
        db.update_booking(
            first.id,
            &RoomBookingUpdate {
                end_time: Some(at(10, 15)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    }
}

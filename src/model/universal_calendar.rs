//! Universal calendar: every `(service_id, date)` on which a service runs,
//! with calendar_dates exceptions applied.

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate};
use rusqlite::types::Value;

use super::copy::Row;
use super::{EntityKind, EntityLoader, LoadInput, Source};
use crate::error::{LoadError, LoadResult};
use crate::pipeline::ExecutionContext;

const ISO_DATE: &str = "%Y-%m-%d";

/// Exception type that adds a service date; `2` removes one.
const SERVICE_ADDED: i64 = 1;
const SERVICE_REMOVED: i64 = 2;

#[derive(Debug, Clone)]
struct WeeklyService {
    service_id: String,
    days: [bool; 7],
    start: NaiveDate,
    end: NaiveDate,
}

impl WeeklyService {
    fn runs_on(&self, date: NaiveDate) -> bool {
        self.days[date.weekday().num_days_from_monday() as usize]
    }

    fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start
            .iter_days()
            .take_while(move |d| *d <= self.end)
            .filter(move |d| self.runs_on(*d))
    }
}

fn parse_date(raw: &str) -> LoadResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, ISO_DATE)
        .map_err(|e| LoadError::Database(format!("stored date {raw:?} is invalid: {e}")))
}

/// Expands weekly services and applies exceptions.
fn expand(
    services: &[WeeklyService],
    exceptions: &[(String, NaiveDate, i64)],
) -> BTreeSet<(String, NaiveDate)> {
    let mut dates = BTreeSet::new();
    for service in services {
        for date in service.dates() {
            dates.insert((service.service_id.clone(), date));
        }
    }
    for (service_id, date, exception_type) in exceptions {
        match *exception_type {
            SERVICE_ADDED => {
                dates.insert((service_id.clone(), *date));
            }
            SERVICE_REMOVED => {
                dates.remove(&(service_id.clone(), *date));
            }
            _ => {}
        }
    }
    dates
}

pub struct UniversalCalendar;

impl UniversalCalendar {
    fn read_services(ctx: &ExecutionContext<'_>) -> LoadResult<Vec<WeeklyService>> {
        let sql = format!(
            "SELECT service_id, monday, tuesday, wednesday, thursday, friday, saturday, sunday, \
             start_date, end_date FROM {}",
            ctx.table(EntityKind::Calendar).qualified_name()
        );
        let mut stmt = ctx.connection().prepare(&sql)?;
        let raw = stmt
            .query_map([], |row| {
                let mut days = [false; 7];
                for (i, day) in days.iter_mut().enumerate() {
                    *day = row.get::<_, i64>(i + 1)? == 1;
                }
                Ok((
                    row.get::<_, String>(0)?,
                    days,
                    row.get::<_, String>(8)?,
                    row.get::<_, String>(9)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        raw.into_iter()
            .map(|(service_id, days, start, end)| {
                Ok(WeeklyService {
                    service_id,
                    days,
                    start: parse_date(&start)?,
                    end: parse_date(&end)?,
                })
            })
            .collect()
    }

    fn read_exceptions(ctx: &ExecutionContext<'_>) -> LoadResult<Vec<(String, NaiveDate, i64)>> {
        let sql = format!(
            "SELECT service_id, date, exception_type FROM {}",
            ctx.table(EntityKind::CalendarDate).qualified_name()
        );
        let mut stmt = ctx.connection().prepare(&sql)?;
        let raw = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        raw.into_iter()
            .map(|(service_id, date, exception_type)| {
                Ok((service_id, parse_date(&date)?, exception_type))
            })
            .collect()
    }
}

impl EntityLoader for UniversalCalendar {
    fn kind(&self) -> EntityKind {
        EntityKind::UniversalCalendar
    }

    fn source(&self) -> Source {
        Source::Derived
    }

    fn reads(&self) -> &'static [EntityKind] {
        &[EntityKind::Calendar, EntityKind::CalendarDate]
    }

    fn load(&self, ctx: &ExecutionContext<'_>, _input: LoadInput<'_>) -> LoadResult<usize> {
        let services = Self::read_services(ctx)?;
        let exceptions = Self::read_exceptions(ctx)?;
        let dates = expand(&services, &exceptions);

        let table = ctx.table(EntityKind::UniversalCalendar);
        let tx = ctx.connection().unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(&table.insert_sql(false))?;
            for (service_id, date) in &dates {
                let mut row = Row::empty(table);
                row.set("service_id", Value::Text(service_id.clone()));
                row.set("date", Value::Text(date.format(ISO_DATE).to_string()));
                row.insert(&mut stmt)?;
            }
        }
        tx.commit()?;
        Ok(dates.len())
    }
}

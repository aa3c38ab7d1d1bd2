use super::{folder_for, index_folders, NEUTRAL_ACCENT, NEUTRAL_TINT, TINT_ALPHA};
use crate::plugins::planner::types::{Folder, Todo};
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// Tasks rendered individually per day cell; the rest collapse into "+N more".
pub const MAX_TASKS_PER_DAY: usize = 3;
pub const WEEK_GRID_DAYS: usize = 7;
/// Six full weeks, whatever the month length.
pub const MONTH_GRID_DAYS: usize = 42;

pub const WEEK_HEADERS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
pub const MONTH_HEADERS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarMode {
    #[default]
    Week,
    Month,
}

impl FromStr for CalendarMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "week" | "weekly" => Ok(CalendarMode::Week),
            "month" | "monthly" => Ok(CalendarMode::Month),
            other => Err(format!("Unknown calendar view: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarTask {
    pub id: String,
    pub title: String,
    pub completed: bool,
    pub folder_id: Option<String>,
    /// Cell background: folder color + alpha, or neutral gray.
    pub tint: String,
    /// Left border: folder color, or neutral gray.
    pub accent: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub is_today: bool,
    /// Always true in week mode.
    pub in_current_month: bool,
    pub tasks: Vec<CalendarTask>,
    /// Tasks due this day that did not fit in the cell.
    pub hidden: usize,
}

impl CalendarDay {
    pub fn day_of_month(&self) -> u32 {
        self.date.day()
    }

    pub fn total(&self) -> usize {
        self.tasks.len() + self.hidden
    }

    pub fn overflow_label(&self) -> Option<String> {
        (self.hidden > 0).then(|| format!("+{} more", self.hidden))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarView {
    pub mode: CalendarMode,
    pub reference: NaiveDate,
    pub title: String,
    pub headers: [&'static str; 7],
    pub days: Vec<CalendarDay>,
}

impl CalendarView {
    /// Rows of seven cells.
    pub fn weeks(&self) -> impl Iterator<Item = &[CalendarDay]> {
        self.days.chunks(7)
    }

    pub fn day(&self, date: NaiveDate) -> Option<&CalendarDay> {
        self.days.iter().find(|d| d.date == date)
    }
}

/// First cell of the grid: the Monday on/before `reference` (week), or the
/// Sunday on/before the 1st of its month (month).
pub fn grid_start(reference: NaiveDate, mode: CalendarMode) -> NaiveDate {
    match mode {
        CalendarMode::Week => {
            reference - Duration::days(reference.weekday().num_days_from_monday() as i64)
        }
        CalendarMode::Month => {
            let first = reference.with_day(1).unwrap_or(reference);
            first - Duration::days(first.weekday().num_days_from_sunday() as i64)
        }
    }
}

pub fn visible_days(reference: NaiveDate, mode: CalendarMode) -> Vec<NaiveDate> {
    let start = grid_start(reference, mode);
    let len = match mode {
        CalendarMode::Week => WEEK_GRID_DAYS,
        CalendarMode::Month => MONTH_GRID_DAYS,
    };
    (0..len as i64).map(|i| start + Duration::days(i)).collect()
}

/// `"Mar 11 - Mar 17, 2024"` for a week, `"March 2024"` for a month.
pub fn range_title(reference: NaiveDate, mode: CalendarMode) -> String {
    match mode {
        CalendarMode::Week => {
            let start = grid_start(reference, mode);
            let end = start + Duration::days(6);
            format!("{} - {}", start.format("%b %-d"), end.format("%b %-d, %Y"))
        }
        CalendarMode::Month => reference.format("%B %Y").to_string(),
    }
}

fn to_task(todo: &Todo, folder: Option<&Folder>) -> CalendarTask {
    CalendarTask {
        id: todo.id.clone(),
        title: todo.title.clone(),
        completed: todo.completed,
        folder_id: todo.folder_id.clone(),
        tint: folder.map_or_else(|| NEUTRAL_TINT.to_string(), |f| f.tint(TINT_ALPHA)),
        accent: folder.map_or_else(|| NEUTRAL_ACCENT.to_string(), |f| f.color.clone()),
    }
}

/// Lay `todos` out on the grid around `reference`. Undated todos are skipped.
pub fn project_calendar(
    todos: &[Todo],
    folders: &[Folder],
    reference: NaiveDate,
    today: NaiveDate,
    mode: CalendarMode,
) -> CalendarView {
    let folders = index_folders(folders);

    let mut by_day: HashMap<NaiveDate, Vec<&Todo>> = HashMap::new();
    for todo in todos {
        if let Some(due) = todo.due_date {
            by_day.entry(due.date()).or_default().push(todo);
        }
    }

    let days = visible_days(reference, mode)
        .into_iter()
        .map(|date| {
            let due = by_day.get(&date).map(Vec::as_slice).unwrap_or(&[]);
            let tasks = due
                .iter()
                .take(MAX_TASKS_PER_DAY)
                .map(|todo| to_task(todo, folder_for(&folders, todo.folder_id.as_deref())))
                .collect();

            CalendarDay {
                date,
                is_today: date == today,
                in_current_month: match mode {
                    CalendarMode::Week => true,
                    CalendarMode::Month => {
                        date.month() == reference.month() && date.year() == reference.year()
                    }
                },
                tasks,
                hidden: due.len().saturating_sub(MAX_TASKS_PER_DAY),
            }
        })
        .collect();

    CalendarView {
        mode,
        reference,
        title: range_title(reference, mode),
        headers: match mode {
            CalendarMode::Week => WEEK_HEADERS,
            CalendarMode::Month => MONTH_HEADERS,
        },
        days,
    }
}

/// Previous / next / today controls for the calendar.
///
/// Month steps clamp to the end of shorter months but remember the day the
/// user started from, so Jan 31 → Feb 29 → Mar 31.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarNavigator {
    mode: CalendarMode,
    reference: NaiveDate,
    anchor_day: u32,
}

impl CalendarNavigator {
    pub fn new(mode: CalendarMode, reference: NaiveDate) -> Self {
        Self {
            mode,
            reference,
            anchor_day: reference.day(),
        }
    }

    pub fn mode(&self) -> CalendarMode {
        self.mode
    }

    pub fn reference(&self) -> NaiveDate {
        self.reference
    }

    pub fn set_mode(&mut self, mode: CalendarMode) {
        self.mode = mode;
    }

    pub fn previous(&mut self) {
        self.step(-1);
    }

    pub fn next(&mut self) {
        self.step(1);
    }

    pub fn today(&mut self, today: NaiveDate) {
        *self = Self::new(self.mode, today);
    }

    fn step(&mut self, direction: i32) {
        match self.mode {
            CalendarMode::Week => {
                self.reference = self.reference + Duration::days(7 * direction as i64);
                self.anchor_day = self.reference.day();
            }
            CalendarMode::Month => {
                let months = self.reference.year() * 12 + self.reference.month0() as i32 + direction;
                let (year, month) = (months.div_euclid(12), months.rem_euclid(12) as u32 + 1);
                let day = self.anchor_day.min(days_in_month(year, month));
                if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                    self.reference = date;
                }
            }
        }
    }

    pub fn project(&self, todos: &[Todo], folders: &[Folder], today: NaiveDate) -> CalendarView {
        project_calendar(todos, folders, self.reference, today, self.mode)
    }
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map_or(31, |last| last.day())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::planner::types::{CreateFolderInput, CreateTodoInput};
    use crate::sync::SyncRecord;
    use chrono::{Utc, Weekday};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn todo(id: &str, due: &str) -> Todo {
        Todo::new_local(
            id.to_string(),
            "o1",
            &CreateTodoInput {
                title: format!("task {}", id),
                due_date: Some(due.parse().unwrap()),
                ..CreateTodoInput::default()
            },
            Utc::now(),
        )
    }

    fn folder(id: &str, color: &str) -> Folder {
        Folder::new_local(
            id.to_string(),
            "o1",
            &CreateFolderInput {
                name: id.to_string(),
                color: color.to_string(),
            },
            Utc::now(),
        )
    }

    #[test]
    fn test_week_grid_starts_monday() {
        // 2024-03-17 is a Sunday; its week starts Monday 2024-03-11.
        let days = visible_days(day(2024, 3, 17), CalendarMode::Week);
        assert_eq!(days.len(), 7);
        assert_eq!(days[0], day(2024, 3, 11));
        assert_eq!(days[0].weekday(), Weekday::Mon);
        assert_eq!(days[6], day(2024, 3, 17));
    }

    #[test]
    fn test_month_grid_is_always_42_days_from_sunday() {
        for (y, m) in [(2023, 2), (2024, 2), (2024, 4), (2024, 3), (2026, 2)] {
            let days = visible_days(day(y, m, 15), CalendarMode::Month);
            assert_eq!(days.len(), MONTH_GRID_DAYS, "{}-{}", y, m);
            assert_eq!(days[0].weekday(), Weekday::Sun);
            assert!(days[0] <= day(y, m, 1));
            assert!(days.contains(&day(y, m, days_in_month(y, m))));
        }
    }

    #[test]
    fn test_month_starting_sunday_starts_on_the_first() {
        // September 2024 starts on a Sunday.
        let days = visible_days(day(2024, 9, 20), CalendarMode::Month);
        assert_eq!(days[0], day(2024, 9, 1));
    }

    #[test]
    fn test_due_date_buckets_to_its_calendar_day_only() {
        let todos = vec![todo("a", "2024-03-15T10:00")];

        for mode in [CalendarMode::Week, CalendarMode::Month] {
            let view = project_calendar(&todos, &[], day(2024, 3, 15), day(2024, 1, 1), mode);
            for cell in &view.days {
                let expected = usize::from(cell.date == day(2024, 3, 15));
                assert_eq!(cell.total(), expected, "{:?} {}", mode, cell.date);
            }
        }
    }

    #[test]
    fn test_cap_at_three_with_overflow_label() {
        let todos: Vec<Todo> = (0..5).map(|i| todo(&i.to_string(), "2024-03-15")).collect();
        let view = project_calendar(&todos, &[], day(2024, 3, 15), day(2024, 3, 15), CalendarMode::Week);

        let cell = view.day(day(2024, 3, 15)).unwrap();
        assert_eq!(cell.tasks.len(), 3);
        assert_eq!(cell.hidden, 2);
        assert_eq!(cell.overflow_label().as_deref(), Some("+2 more"));
        let ids: Vec<&str> = cell.tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["0", "1", "2"]);
    }

    #[test]
    fn test_tasks_are_tinted_by_folder() {
        let mut filed = todo("filed", "2024-03-15");
        filed.folder_id = Some("math".to_string());
        filed.completed = true;
        let mut dangling = todo("dangling", "2024-03-15");
        dangling.folder_id = Some("deleted".to_string());
        let loose = todo("loose", "2024-03-15");

        let view = project_calendar(
            &[filed, dangling, loose],
            &[folder("math", "#FF6B6B")],
            day(2024, 3, 15),
            day(2024, 3, 15),
            CalendarMode::Week,
        );
        let tasks = &view.day(day(2024, 3, 15)).unwrap().tasks;

        assert_eq!(tasks[0].tint, "#FF6B6B30");
        assert_eq!(tasks[0].accent, "#FF6B6B");
        assert!(tasks[0].completed);
        assert_eq!(tasks[1].tint, NEUTRAL_TINT);
        assert_eq!(tasks[2].accent, NEUTRAL_ACCENT);
    }

    #[test]
    fn test_today_and_current_month_flags() {
        let view = project_calendar(&[], &[], day(2024, 3, 15), day(2024, 3, 20), CalendarMode::Month);

        let today: Vec<NaiveDate> = view.days.iter().filter(|d| d.is_today).map(|d| d.date).collect();
        assert_eq!(today, vec![day(2024, 3, 20)]);

        // March 2024 grid opens on Sunday Feb 25.
        assert_eq!(view.days[0].date, day(2024, 2, 25));
        assert!(!view.days[0].in_current_month);
        assert!(view.day(day(2024, 3, 1)).unwrap().in_current_month);
        assert!(!view.days[41].in_current_month);
        assert_eq!(view.headers[0], "Sun");

        let week = project_calendar(&[], &[], day(2024, 3, 31), day(2024, 3, 20), CalendarMode::Week);
        assert!(week.days.iter().all(|d| d.in_current_month));
        assert_eq!(week.headers[0], "Mon");
    }

    #[test]
    fn test_range_titles() {
        assert_eq!(
            range_title(day(2024, 3, 13), CalendarMode::Week),
            "Mar 11 - Mar 17, 2024"
        );
        assert_eq!(range_title(day(2024, 3, 13), CalendarMode::Month), "March 2024");
    }

    #[test]
    fn test_navigator_week_steps() {
        let mut nav = CalendarNavigator::new(CalendarMode::Week, day(2024, 2, 27));
        nav.next();
        assert_eq!(nav.reference(), day(2024, 3, 5));
        nav.previous();
        nav.previous();
        assert_eq!(nav.reference(), day(2024, 2, 20));
    }

    #[test]
    fn test_navigator_month_steps_keep_day_of_month() {
        let mut nav = CalendarNavigator::new(CalendarMode::Month, day(2024, 1, 31));
        nav.next();
        assert_eq!(nav.reference(), day(2024, 2, 29));
        nav.next();
        assert_eq!(nav.reference(), day(2024, 3, 31));
        nav.next();
        assert_eq!(nav.reference(), day(2024, 4, 30));
        nav.previous();
        nav.previous();
        assert_eq!(nav.reference(), day(2024, 2, 29));
    }

    #[test]
    fn test_navigator_crosses_year_boundaries() {
        let mut nav = CalendarNavigator::new(CalendarMode::Month, day(2024, 12, 15));
        nav.next();
        assert_eq!(nav.reference(), day(2025, 1, 15));
        nav.previous();
        nav.previous();
        assert_eq!(nav.reference(), day(2024, 11, 15));
    }

    #[test]
    fn test_navigator_today_resets_anchor() {
        let mut nav = CalendarNavigator::new(CalendarMode::Month, day(2024, 1, 31));
        nav.today(day(2024, 6, 10));
        nav.next();
        assert_eq!(nav.reference(), day(2024, 7, 10));
    }

    #[test]
    fn test_calendar_mode_from_str() {
        assert_eq!("weekly".parse::<CalendarMode>(), Ok(CalendarMode::Week));
        assert_eq!("Month".parse::<CalendarMode>(), Ok(CalendarMode::Month));
        assert!("yearly".parse::<CalendarMode>().is_err());
    }
}

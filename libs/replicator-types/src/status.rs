/// Status codes returned per notification (spec §6). Accumulated across a
/// notification's lifetime — highest wins (`2 > 1 > 0`, spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum NotificationStatus {
    #[default]
    Ok = 0,
    ApiError = 1,
    SqlError = 2,
}

impl NotificationStatus {
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Folds another status into this one, keeping whichever is worse.
    pub fn escalate(&mut self, other: Self) {
        if other > *self {
            *self = other;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escalation_keeps_the_highest_severity() {
        let mut status = NotificationStatus::Ok;
        status.escalate(NotificationStatus::ApiError);
        assert_eq!(status, NotificationStatus::ApiError);
        status.escalate(NotificationStatus::SqlError);
        assert_eq!(status, NotificationStatus::SqlError);
        status.escalate(NotificationStatus::ApiError);
        assert_eq!(status, NotificationStatus::SqlError);
    }
}

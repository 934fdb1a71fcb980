use chrono::{DateTime, Utc};

/// 현재 시각 공급자. 만료와 TOTP 시간 창 계산은 모두 이 트레이트를 거친다.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn timestamp(&self) -> i64 {
        self.now().timestamp()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 테스트에서 시간을 직접 움직이는 시계
#[cfg(test)]
pub struct ManualClock {
    now: std::sync::Mutex<DateTime<Utc>>,
}

#[cfg(test)]
impl ManualClock {
    pub fn at(timestamp: i64) -> Self {
        Self {
            now: std::sync::Mutex::new(DateTime::from_timestamp(timestamp, 0).unwrap()),
        }
    }

    pub fn advance_secs(&self, secs: i64) {
        let mut now = self.now.lock().unwrap();
        *now += chrono::Duration::seconds(secs);
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

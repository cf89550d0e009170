//! Prompt construction for the daily digest.
//!
//! The prompt is a fixed template with the Beijing timestamp substituted in.
//! Nothing here performs I/O; the caller supplies the clock.

use chrono::{DateTime, FixedOffset, Utc};
use std::sync::LazyLock;

/// UTC+8. Beijing does not observe daylight saving, so a fixed offset is exact.
static BEIJING: LazyLock<FixedOffset> =
    LazyLock::new(|| FixedOffset::east_opt(8 * 3600).expect("UTC+8 is within ±24h"));

/// People and organisations the digest always reports on.
pub const MONITORED: &[(&str, &str)] = &[
    ("DeepMind", "Demis Hassabis"),
    ("OpenAI", "Sam Altman"),
    ("Meta", "Yann LeCun"),
    ("Anthropic", "Dario Amodei"),
];

pub const SYSTEM_INSTRUCTION: &str =
    "你是一个专业的AI行业情报分析师。你的任务是搜索最新信息并生成HTML日报。";

/// Format `now` as Beijing wall-clock time, e.g. `2025年01月01日 08:00`.
pub fn beijing_timestamp(now: DateTime<Utc>) -> String {
    now.with_timezone(&*BEIJING)
        .format("%Y年%m月%d日 %H:%M")
        .to_string()
}

/// Render the user prompt for the given formatted timestamp.
pub fn build_prompt(timestamp: &str) -> String {
    let monitored = MONITORED
        .iter()
        .map(|(org, person)| format!("{org} ({person})"))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"Current Time (Beijing): {timestamp}

Task: Search the web for AI news in the past 24 hours and generate a single-file HTML5 Dashboard.

【关键要求】
1. **必须联网**: 使用 Google Search 工具获取真实信息。
2. **真实链接**: 每个新闻必须附带 Search Tool 返回的原始 URL。
3. **监测名单**: {monitored}。
4. **空状态**: 如果某人无动态，必须显示“今日无动态”。

【HTML 输出规范】
1. 使用 Tailwind CSS (CDN)。
2. 深色模式 (Dark Mode, Slate-900)。
3. 包含 JavaScript 实现 Tab 切换。
4. 所有文字为简体中文。

Output ONLY the raw HTML code. Start with <!DOCTYPE html>.
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_beijing_timestamp_shifts_eight_hours() {
        let now = Utc.with_ymd_and_hms(2024, 12, 31, 16, 0, 0).unwrap();
        assert_eq!(beijing_timestamp(now), "2025年01月01日 00:00");
        assert_eq!(BEIJING.local_minus_utc(), 8 * 3600);
    }

    #[test]
    fn test_prompt_embeds_timestamp() {
        let prompt = build_prompt("2025年01月01日 00:00");
        assert!(prompt.contains("Current Time (Beijing): 2025年01月01日 00:00"));
        assert!(prompt.contains("<!DOCTYPE html>"));
    }

    #[test]
    fn test_prompt_lists_every_monitored_entity() {
        let prompt = build_prompt("t");
        for (org, person) in MONITORED {
            assert!(prompt.contains(&format!("{org} ({person})")));
        }
        assert!(prompt.contains("今日无动态"));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        assert_eq!(build_prompt("x"), build_prompt("x"));
    }
}

//! Email template rendering engine.
//!
//! Handlebars templates for every notification category. Rendering is pure:
//! callers resolve all data first, and the engine never performs I/O.
//!
//! HTML bodies go through a registry with HTML escaping; plain-text bodies use
//! a second registry that leaves values untouched.

use chrono::{DateTime, Utc};
use handlebars::{Handlebars, no_escape};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use crate::error::{NotificationError, NotificationResult};

/// Rendered email content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedEmail {
    /// Email subject line.
    pub subject: String,
    /// HTML body content.
    pub html: String,
    /// Plain text body content.
    pub text: String,
}

// ============================================================================
// Template data
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct AnnouncementEmailData {
    pub student_name: String,
    pub announcement_title: String,
    pub announcement_content: String,
    pub course_name: String,
    pub instructor_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssignmentSubmittedData {
    pub student_name: String,
    pub assignment_title: String,
    pub course_name: String,
    pub attempt_number: u32,
    pub submitted_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssignmentGradedData {
    pub student_name: String,
    pub assignment_title: String,
    pub course_name: String,
    pub score: u32,
    pub total_points: u32,
    /// Omitted from the email entirely when `None` or blank.
    pub feedback: Option<String>,
}

/// Shared by quiz submissions and quiz grades.
#[derive(Debug, Clone, Serialize)]
pub struct QuizResultData {
    pub student_name: String,
    pub quiz_title: String,
    pub course_name: String,
    pub score: u32,
    pub total_questions: u32,
    pub submitted_at: String,
}

// ============================================================================
// Helpers
// ============================================================================

/// `score / total * 100`, rounded to one decimal place.
///
/// A zero total is a data-integrity error rather than `NaN` or `inf`.
pub fn compute_percentage(score: u32, total: u32) -> NotificationResult<f64> {
    if total == 0 {
        return Err(NotificationError::InvalidScore { score, total });
    }
    let ratio = f64::from(score) / f64::from(total) * 100.0;
    Ok((ratio * 10.0).round() / 10.0)
}

/// Percentage with exactly one decimal, e.g. `80.0`.
pub fn format_percentage(percentage: f64) -> String {
    format!("{percentage:.1}")
}

/// Human-readable timestamp, e.g. `March 1, 2025 at 2:30 PM UTC`.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format("%B %-d, %Y at %-I:%M %p UTC").to_string()
}

/// Escapes only the characters HTML markup and quoted attributes need.
pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// ============================================================================
// Engine
// ============================================================================

const TEMPLATES: [(&str, &str, &str); 4] = [
    ("announcement", ANNOUNCEMENT_HTML_TEMPLATE, ANNOUNCEMENT_TEXT_TEMPLATE),
    (
        "assignment_submitted",
        ASSIGNMENT_SUBMITTED_HTML_TEMPLATE,
        ASSIGNMENT_SUBMITTED_TEXT_TEMPLATE,
    ),
    (
        "assignment_graded",
        ASSIGNMENT_GRADED_HTML_TEMPLATE,
        ASSIGNMENT_GRADED_TEXT_TEMPLATE,
    ),
    ("quiz_result", QUIZ_RESULT_HTML_TEMPLATE, QUIZ_RESULT_TEXT_TEMPLATE),
];

/// Template engine for rendering notification emails.
#[derive(Clone)]
pub struct TemplateEngine {
    html: Arc<Handlebars<'static>>,
    text: Arc<Handlebars<'static>>,
}

impl TemplateEngine {
    /// Create a new template engine with all templates registered.
    pub fn new() -> NotificationResult<Self> {
        let mut html = Handlebars::new();
        html.register_escape_fn(escape_html);
        let mut text = Handlebars::new();
        text.register_escape_fn(no_escape);

        for (name, html_source, text_source) in TEMPLATES {
            html.register_template_string(name, html_source).map_err(|e| {
                NotificationError::TemplateError(format!("Failed to register {name} html: {e}"))
            })?;
            text.register_template_string(name, text_source).map_err(|e| {
                NotificationError::TemplateError(format!("Failed to register {name} text: {e}"))
            })?;
        }

        Ok(Self {
            html: Arc::new(html),
            text: Arc::new(text),
        })
    }

    fn render<T: Serialize>(&self, name: &str, subject: String, data: &T) -> NotificationResult<RenderedEmail> {
        Ok(RenderedEmail {
            html: self.html.render(name, data)?,
            text: self.text.render(name, data)?,
            subject,
        })
    }

    /// Render an announcement email.
    pub fn render_announcement(&self, data: &AnnouncementEmailData) -> NotificationResult<RenderedEmail> {
        debug!(course = %data.course_name, "Rendering announcement email");

        let subject = format!("📢 New Announcement: {}", data.announcement_title);
        self.render("announcement", subject, data)
    }

    /// Render an assignment submission receipt.
    pub fn render_assignment_submitted(
        &self,
        data: &AssignmentSubmittedData,
    ) -> NotificationResult<RenderedEmail> {
        debug!(course = %data.course_name, attempt = data.attempt_number, "Rendering assignment submitted email");

        let subject = format!("✅ Assignment Submitted: {}", data.assignment_title);
        self.render("assignment_submitted", subject, data)
    }

    /// Render an assignment grade email.
    pub fn render_assignment_graded(&self, data: &AssignmentGradedData) -> NotificationResult<RenderedEmail> {
        let percentage = compute_percentage(data.score, data.total_points)?;
        debug!(course = %data.course_name, percentage, "Rendering assignment graded email");

        let context = json!({
            "student_name": data.student_name,
            "assignment_title": data.assignment_title,
            "course_name": data.course_name,
            "score": data.score,
            "total_points": data.total_points,
            "percentage": format_percentage(percentage),
            "feedback": non_blank(data.feedback.as_deref()),
        });

        let subject = format!(
            "📊 Assignment Graded: {} - {}/{}",
            data.assignment_title, data.score, data.total_points
        );
        self.render("assignment_graded", subject, &context)
    }

    /// Render a quiz result email (quiz submitted and quiz graded).
    pub fn render_quiz_result(&self, data: &QuizResultData) -> NotificationResult<RenderedEmail> {
        let percentage = compute_percentage(data.score, data.total_questions)?;
        debug!(course = %data.course_name, percentage, "Rendering quiz result email");

        let context = json!({
            "student_name": data.student_name,
            "quiz_title": data.quiz_title,
            "course_name": data.course_name,
            "score": data.score,
            "total_questions": data.total_questions,
            "percentage": format_percentage(percentage),
            "submitted_at": data.submitted_at,
        });

        let subject = format!(
            "✅ Quiz Submitted: {} - {}/{}",
            data.quiz_title, data.score, data.total_questions
        );
        self.render("quiz_result", subject, &context)
    }
}

// ============================================================================
// Email Templates
// ============================================================================

const ANNOUNCEMENT_HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>New Announcement</title>
</head>
<body style="margin: 0; padding: 0; font-family: Arial, sans-serif; line-height: 1.6; color: #333333;">
  <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
    <div style="background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); color: #ffffff; padding: 30px; text-align: center; border-radius: 10px 10px 0 0;">
      <h1>📢 New Announcement</h1>
    </div>
    <div style="background: #f9f9f9; padding: 30px; border-radius: 0 0 10px 10px;">
      <p>Hi {{student_name}},</p>
      <p>Your instructor <strong>{{instructor_name}}</strong> has posted a new announcement in <strong>{{course_name}}</strong>:</p>
      <div style="background: #ffffff; padding: 20px; border-left: 4px solid #667eea; margin: 20px 0; border-radius: 5px;">
        <h2>{{announcement_title}}</h2>
        <p>{{announcement_content}}</p>
      </div>
      <p>Log in to view the full announcement and any attachments.</p>
    </div>
    <div style="text-align: center; padding: 20px; color: #666666; font-size: 12px;">
      <p>This is an automated email from Educate Classroom. Please do not reply.</p>
    </div>
  </div>
</body>
</html>"#;

const ANNOUNCEMENT_TEXT_TEMPLATE: &str = r#"Hi {{student_name}},

Your instructor {{instructor_name}} has posted a new announcement in {{course_name}}:

{{announcement_title}}
{{announcement_content}}

Log in to view the full announcement."#;

const ASSIGNMENT_SUBMITTED_HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <title>Assignment Submitted</title>
</head>
<body style="margin: 0; padding: 0; font-family: Arial, sans-serif;">
  <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
    <div style="background: linear-gradient(135deg, #11998e 0%, #38ef7d 100%); color: #ffffff; padding: 30px; text-align: center; border-radius: 10px 10px 0 0;">
      <h1>✅ Assignment Submitted</h1>
    </div>
    <div style="background: #f9f9f9; padding: 30px;">
      <p>Hi {{student_name}},</p>
      <p>Your assignment has been submitted successfully!</p>
      <div style="background: #ffffff; padding: 20px; border-radius: 5px; margin: 20px 0;">
        <p><strong>Course:</strong> {{course_name}}</p>
        <p><strong>Assignment:</strong> {{assignment_title}}</p>
        <p><strong>Attempt:</strong> #{{attempt_number}}</p>
        <p><strong>Submitted:</strong> {{submitted_at}}</p>
      </div>
    </div>
  </div>
</body>
</html>"#;

const ASSIGNMENT_SUBMITTED_TEXT_TEMPLATE: &str = r#"Hi {{student_name}},

Your assignment has been submitted!

Course: {{course_name}}
Assignment: {{assignment_title}}
Attempt: #{{attempt_number}}
Submitted: {{submitted_at}}"#;

const ASSIGNMENT_GRADED_HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <title>Assignment Graded</title>
</head>
<body style="margin: 0; padding: 0; font-family: Arial, sans-serif;">
  <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
    <div style="background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); color: #ffffff; padding: 30px; text-align: center; border-radius: 10px 10px 0 0;">
      <h1>📊 Assignment Graded</h1>
    </div>
    <div style="background: #f9f9f9; padding: 30px;">
      <p>Hi {{student_name}},</p>
      <p>Your assignment for <strong>{{course_name}}</strong> has been graded!</p>
      <div style="background: #ffffff; padding: 30px; text-align: center; border-radius: 10px; margin: 20px 0;">
        <div style="font-size: 48px; font-weight: bold; color: #667eea;">{{score}}/{{total_points}}</div>
        <div style="font-size: 24px; color: #666666;">{{percentage}}%</div>
        <p style="color: #666666;">{{assignment_title}}</p>
      </div>
      {{#if feedback}}
      <div class="feedback" style="background: #fff3cd; padding: 20px; border-left: 4px solid #ffc107; border-radius: 5px;">
        <h3>💬 Instructor Feedback</h3>
        <p>{{feedback}}</p>
      </div>
      {{/if}}
    </div>
  </div>
</body>
</html>"#;

const ASSIGNMENT_GRADED_TEXT_TEMPLATE: &str = r#"Hi {{student_name}},

Your assignment has been graded!

Course: {{course_name}}
Assignment: {{assignment_title}}
Score: {{score}}/{{total_points}} ({{percentage}}%)
{{#if feedback}}

Feedback: {{feedback}}
{{/if}}"#;

const QUIZ_RESULT_HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <title>Quiz Completed</title>
</head>
<body style="margin: 0; padding: 0; font-family: Arial, sans-serif;">
  <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
    <div style="background: linear-gradient(135deg, #f093fb 0%, #f5576c 100%); color: #ffffff; padding: 30px; text-align: center; border-radius: 10px 10px 0 0;">
      <h1>✅ Quiz Completed</h1>
    </div>
    <div style="background: #f9f9f9; padding: 30px;">
      <p>Hi {{student_name}},</p>
      <p>You have successfully completed the quiz for <strong>{{course_name}}</strong>!</p>
      <div style="background: #ffffff; padding: 30px; text-align: center; border-radius: 10px; margin: 20px 0;">
        <div style="font-size: 48px; font-weight: bold; color: #f5576c;">{{score}}/{{total_questions}}</div>
        <div style="font-size: 24px; color: #666666;">{{percentage}}%</div>
        <p style="color: #666666;">{{quiz_title}}</p>
        <p style="color: #999999; font-size: 14px;">Submitted: {{submitted_at}}</p>
      </div>
    </div>
  </div>
</body>
</html>"#;

const QUIZ_RESULT_TEXT_TEMPLATE: &str = r#"Hi {{student_name}},

Quiz completed!

Course: {{course_name}}
Quiz: {{quiz_title}}
Score: {{score}}/{{total_questions}} ({{percentage}}%)
Submitted: {{submitted_at}}"#;

//! Notification events and their email templates.

use mentorship_core::gateways::EmailMessage;
use mentorship_core::time_range::TimeRange;
use mentorship_core::types::{Appointment, RescheduleProposal, UserId, UserProfile};

/// Something that happened to an appointment and deserves an email.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BookingEvent {
    /// A paid booking is waiting for payment; the mentor is told
    Requested(Appointment),
    /// Confirmed through the explicit confirm path
    Confirmed(Appointment),
    /// Payment recorded (or a free booking auto-confirmed)
    Paid(Appointment),
    /// Canceled by a party or by hold expiry (`by` is `None`)
    Canceled {
        /// The canceled appointment
        appointment: Appointment,
        /// Who canceled it
        by: Option<UserId>,
    },
    /// New alternative times offered to the receiver
    RescheduleProposed {
        /// The appointment being moved
        appointment: Appointment,
        /// The proposal
        proposal: RescheduleProposal,
    },
    /// A proposal was accepted and the appointment moved
    Rescheduled(Appointment),
}

impl BookingEvent {
    /// The appointment the event concerns.
    #[must_use]
    pub const fn appointment(&self) -> &Appointment {
        match self {
            Self::Requested(a) | Self::Confirmed(a) | Self::Paid(a) | Self::Rescheduled(a) => a,
            Self::Canceled { appointment, .. } | Self::RescheduleProposed { appointment, .. } => {
                appointment
            }
        }
    }

    /// Short label for logs and metrics.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Requested(_) => "requested",
            Self::Confirmed(_) => "confirmed",
            Self::Paid(_) => "paid",
            Self::Canceled { .. } => "canceled",
            Self::RescheduleProposed { .. } => "reschedule_proposed",
            Self::Rescheduled(_) => "rescheduled",
        }
    }
}

/// Rendered emails for the two parties; either may be absent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Envelope {
    /// Email for the mentor
    pub mentor: Option<EmailMessage>,
    /// Email for the mentee
    pub mentee: Option<EmailMessage>,
}

/// Render the emails an event produces.
#[must_use]
pub fn render(event: &BookingEvent, mentor: &UserProfile, mentee: &UserProfile) -> Envelope {
    let appointment = event.appointment();
    let when = describe(&appointment.time_range);
    let service = appointment.service_type.as_str().replace('_', " ");

    match event {
        BookingEvent::Requested(_) => Envelope {
            mentor: Some(message(
                mentor,
                format!("New booking request from {}", mentee.display_name),
                &[
                    format!("{} requested a {service} with you.", mentee.display_name),
                    format!("When: {when}"),
                    "The slot is held while they complete payment.".to_string(),
                ],
            )),
            mentee: None,
        },
        BookingEvent::Confirmed(_) => Envelope {
            mentor: Some(confirmed_for(mentor, &mentee.display_name, &service, &when)),
            mentee: Some(confirmed_for(mentee, &mentor.display_name, &service, &when)),
        },
        BookingEvent::Paid(a) => {
            let mut receipt = vec![
                format!("Your {service} with {} is confirmed.", mentor.display_name),
                format!("When: {when}"),
            ];
            if !a.price.is_zero() {
                receipt.push(format!("Amount paid: {}", a.price));
            }
            Envelope {
                mentor: Some(confirmed_for(mentor, &mentee.display_name, &service, &when)),
                mentee: Some(message(mentee, format!("Receipt: {service} on {when}"), &receipt)),
            }
        }
        BookingEvent::Canceled { by, .. } => {
            let reason = match by {
                Some(user) if user == &mentor.user_id => format!("{} canceled it.", mentor.display_name),
                Some(user) if user == &mentee.user_id => format!("{} canceled it.", mentee.display_name),
                _ => "The reservation expired before payment completed.".to_string(),
            };
            let body = vec![format!("The {service} scheduled for {when} was canceled."), reason];
            let subject = format!("Canceled: {service} on {when}");
            Envelope {
                mentor: Some(message(mentor, subject.clone(), &body)),
                mentee: Some(message(mentee, subject, &body)),
            }
        }
        BookingEvent::RescheduleProposed { proposal, .. } => {
            let (receiver, proposer) = if proposal.receiver == mentor.user_id {
                (mentor, mentee)
            } else {
                (mentee, mentor)
            };
            let mut lines = vec![format!(
                "{} proposed new times for your {service} currently on {when}:",
                proposer.display_name
            )];
            lines.extend(
                proposal
                    .proposed_time_ranges
                    .iter()
                    .enumerate()
                    .map(|(i, r)| format!("  {}. {}", i + 1, describe(r))),
            );
            let email = message(receiver, format!("New times proposed for your {service}"), &lines);
            if receiver.user_id == mentor.user_id {
                Envelope {
                    mentor: Some(email),
                    mentee: None,
                }
            } else {
                Envelope {
                    mentor: None,
                    mentee: Some(email),
                }
            }
        }
        BookingEvent::Rescheduled(_) => {
            let body = vec![format!("Your {service} now takes place {when}.")];
            Envelope {
                mentor: Some(message(mentor, format!("Rescheduled: {service}"), &body)),
                mentee: Some(message(mentee, format!("Rescheduled: {service}"), &body)),
            }
        }
    }
}

fn confirmed_for(to: &UserProfile, other: &str, service: &str, when: &str) -> EmailMessage {
    message(
        to,
        format!("Confirmed: {service} with {other}"),
        &[format!("Your {service} with {other} is confirmed."), format!("When: {when}")],
    )
}

fn describe(range: &TimeRange) -> String {
    let start = range.start();
    let end = range.end();
    if start.date_naive() == end.date_naive() {
        format!(
            "{} from {} to {} UTC",
            start.format("%A, %B %-d %Y"),
            start.format("%H:%M"),
            end.format("%H:%M")
        )
    } else {
        format!(
            "{} to {} UTC",
            start.format("%A, %B %-d %Y %H:%M"),
            end.format("%A, %B %-d %Y %H:%M")
        )
    }
}

fn message(to: &UserProfile, subject: String, lines: &[String]) -> EmailMessage {
    let greeting = format!("Hi {},", to.display_name);
    let text = std::iter::once(greeting.clone())
        .chain(lines.iter().cloned())
        .collect::<Vec<_>>()
        .join("\n\n");
    let html = std::iter::once(greeting)
        .chain(lines.iter().cloned())
        .map(|line| format!("<p>{}</p>", escape_html(&line)))
        .collect::<String>();

    EmailMessage {
        to: to.email.clone(),
        subject,
        text,
        html,
    }
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mentorship_core::types::{Money, NewAppointment, ProposalId, ServiceType};
    use mentorship_testing::fixtures::{self, MENTEE, MENTOR, range};

    fn appointment(price: u64) -> Appointment {
        Appointment::pending(
            NewAppointment {
                mentor_id: MENTOR.into(),
                mentee_id: MENTEE.into(),
                time_range: range((10, 0), (11, 0)),
                service_type: ServiceType::parse("mock_interview").unwrap(),
                price: Money::from_cents(price),
            },
            Utc::now(),
        )
    }

    #[test]
    fn paid_booking_sends_receipt_with_amount() {
        let envelope = render(
            &BookingEvent::Paid(appointment(12_000)),
            &fixtures::user_profile(MENTOR),
            &fixtures::user_profile(MENTEE),
        );
        let receipt = envelope.mentee.unwrap();
        assert_eq!(receipt.to, fixtures::email_of(MENTEE));
        assert!(receipt.text.contains("$120.00"));
        assert!(receipt.text.contains("Monday, March 3 2025 from 10:00 to 11:00 UTC"));
        assert!(envelope.mentor.unwrap().subject.starts_with("Confirmed"));
    }

    #[test]
    fn requested_only_notifies_mentor() {
        let envelope = render(
            &BookingEvent::Requested(appointment(12_000)),
            &fixtures::user_profile(MENTOR),
            &fixtures::user_profile(MENTEE),
        );
        assert!(envelope.mentor.is_some());
        assert!(envelope.mentee.is_none());
    }

    #[test]
    fn proposal_goes_to_receiver() {
        let appointment = appointment(0);
        let proposal = RescheduleProposal {
            id: ProposalId::new(),
            appointment_id: appointment.id,
            proposed_time_ranges: vec![range((14, 0), (15, 0)), range((16, 0), (17, 0))],
            receiver: MENTEE.into(),
            proposer: MENTOR.into(),
            proposed_at: Utc::now(),
        };
        let envelope = render(
            &BookingEvent::RescheduleProposed {
                appointment,
                proposal,
            },
            &fixtures::user_profile(MENTOR),
            &fixtures::user_profile(MENTEE),
        );
        assert!(envelope.mentor.is_none());
        let email = envelope.mentee.unwrap();
        assert!(email.text.contains("2. Monday, March 3 2025 from 16:00 to 17:00 UTC"));
    }

    #[test]
    fn html_is_escaped() {
        let mut mentee = fixtures::user_profile(MENTEE);
        mentee.display_name = "<script>".to_string();
        let envelope = render(
            &BookingEvent::Confirmed(appointment(0)),
            &fixtures::user_profile(MENTOR),
            &mentee,
        );
        assert!(envelope.mentee.unwrap().html.contains("&lt;script&gt;"));
    }
}

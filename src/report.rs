//! Console report rendering.
//!
//! One block of labeled lines per sighted flight, terminated by a `---`
//! separator, then trailing lines with the run and month call counts.
//! Absent values render as `N/A`.

use crate::types::SightedFlight;
use std::fmt::Write;

/// Render the full report to a string. Kept separate from printing so the
/// exact output can be asserted on.
pub fn render_report(flights: &[SightedFlight], calls_this_run: u32, monthly_calls: u32) -> String {
    let mut out = String::new();

    if flights.is_empty() {
        writeln!(out, "No flights found in the specified area").unwrap();
    } else {
        writeln!(out, "\nFound {} flight(s) in the specified area:", flights.len()).unwrap();
        for flight in flights {
            render_flight(&mut out, flight);
        }
    }

    writeln!(out, "Schedule API calls made this run: {}", calls_this_run).unwrap();
    writeln!(out, "Schedule API calls made this month: {}", monthly_calls).unwrap();
    out
}

pub fn print_report(flights: &[SightedFlight], calls_this_run: u32, monthly_calls: u32) {
    print!("{}", render_report(flights, calls_this_run, monthly_calls));
}

fn render_flight(out: &mut String, flight: &SightedFlight) {
    let detail = &flight.detail;
    let direction = if flight.departing { "Departing" } else { "Arriving" };

    writeln!(out, "Callsign: {}", opt_str(detail.callsign.as_deref())).unwrap();
    writeln!(out, "Heading: {}° ({})", flight.heading, direction).unwrap();
    writeln!(
        out,
        "Last Contact: {}",
        flight.last_contact_local.format("%Y-%m-%d %H:%M:%S %Z")
    )
    .unwrap();
    writeln!(
        out,
        "Origin: {} ({})",
        opt_str(detail.origin.code.as_deref()),
        detail.origin.display
    )
    .unwrap();
    writeln!(
        out,
        "Destination: {} ({})",
        opt_str(detail.destination.code.as_deref()),
        detail.destination.display
    )
    .unwrap();
    writeln!(out, "Operator: {}", opt_str(detail.operator.as_deref())).unwrap();
    writeln!(out, "Aircraft Type: {}", opt_str(detail.aircraft_type.as_deref())).unwrap();
    writeln!(
        out,
        "Aircraft Size: {} ({} seats)",
        detail.aircraft_size, detail.total_seats
    )
    .unwrap();
    writeln!(out, "Speed: {} kts", opt_num(detail.filed_airspeed)).unwrap();
    writeln!(out, "Status: {}", opt_str(detail.status.as_deref())).unwrap();
    writeln!(out, "Delayed: {}", if detail.is_delayed { "Yes" } else { "No" }).unwrap();
    writeln!(
        out,
        "Time in Air: {}",
        detail
            .time_in_air
            .map(format_duration)
            .unwrap_or_else(|| "N/A".to_string())
    )
    .unwrap();
    writeln!(out, "Route Distance: {} nm", opt_num(detail.route_distance)).unwrap();
    writeln!(
        out,
        "Current Position: Lat: {}, Lon: {}, Alt: {} m",
        opt_float(flight.latitude),
        opt_float(flight.longitude),
        opt_float(flight.altitude_m)
    )
    .unwrap();
    writeln!(out, "---").unwrap();
}

fn opt_str(value: Option<&str>) -> &str {
    value.unwrap_or("N/A")
}

fn opt_num(value: Option<u32>) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| v.to_string())
}

fn opt_float(value: Option<f64>) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| v.to_string())
}

fn format_duration(d: chrono::Duration) -> String {
    let secs = d.num_seconds();
    let (sign, secs) = if secs < 0 { ("-", -secs) } else { ("", secs) };
    format!(
        "{}{}:{:02}:{:02}",
        sign,
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60
    )
}

// Terminal front end for the barbershop rankings app.

pub mod tui;


// Currently the only device supported here is the Keithley 2400-series
// SourceMeter.  If multiple manufacturers are ever supported, I'll probably
// organize them into modules by manufacturer

pub mod keithley2400;

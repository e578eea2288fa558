//! Static city climate profiles and astronomical reference dates.

use serde::Serialize;

use crate::domain::Season;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TempRange {
    pub min: f64,
    pub max: f64,
}

impl TempRange {
    const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

/// Climate characteristics of a city
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClimateProfile {
    /// Seasonal daily min/max (°C), indexed winter, spring, summer, fall
    pub temperature: [TempRange; 4],
    /// Seasonal relative humidity (0-1), same order
    pub humidity: [f64; 4],
    /// Typical AQI
    pub aqi_typical: f64,
    /// Diurnal AQI swing
    pub aqi_variation: f64,
    /// 0-1, widens the daily temperature swing
    pub continentality: f64,
    /// 0-1, damps the humidity response
    pub maritime_influence: f64,
    /// 0-1, raises the AQI baseline
    pub pollution_level: f64,
}

impl ClimateProfile {
    fn season_index(season: Season) -> usize {
        match season {
            Season::Winter => 0,
            Season::Spring => 1,
            Season::Summer => 2,
            Season::Fall => 3,
        }
    }

    pub fn temperature_range(&self, season: Season) -> TempRange {
        self.temperature[Self::season_index(season)]
    }

    pub fn base_humidity(&self, season: Season) -> f64 {
        self.humidity[Self::season_index(season)]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct City {
    pub id: &'static str,
    pub name: &'static str,
    pub country: &'static str,
    pub lat: f64,
    pub lon: f64,
    pub timezone: &'static str,
    pub climate: ClimateProfile,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeasonalDate {
    pub id: &'static str,
    pub name: &'static str,
    /// ISO date (YYYY-MM-DD)
    pub date: &'static str,
    pub day_of_year: u32,
    /// Degrees
    pub solar_declination: f64,
}

pub static SEASONAL_DATES: [SeasonalDate; 4] = [
    SeasonalDate {
        id: "winter-solstice",
        name: "Winter Solstice",
        date: "2024-12-21",
        day_of_year: 355,
        solar_declination: -23.44,
    },
    SeasonalDate {
        id: "spring-equinox",
        name: "Spring Equinox",
        date: "2024-03-20",
        day_of_year: 79,
        solar_declination: 0.0,
    },
    SeasonalDate {
        id: "summer-solstice",
        name: "Summer Solstice",
        date: "2024-06-21",
        day_of_year: 172,
        solar_declination: 23.44,
    },
    SeasonalDate {
        id: "fall-equinox",
        name: "Fall Equinox",
        date: "2024-09-22",
        day_of_year: 266,
        solar_declination: 0.0,
    },
];

pub static CITIES: [City; 9] = [
    City {
        id: "san-francisco",
        name: "San Francisco",
        country: "USA",
        lat: 37.77,
        lon: -122.42,
        timezone: "America/Los_Angeles",
        climate: ClimateProfile {
            temperature: [
                TempRange::new(8.0, 15.0),
                TempRange::new(11.0, 18.0),
                TempRange::new(13.0, 22.0),
                TempRange::new(12.0, 20.0),
            ],
            humidity: [0.75, 0.7, 0.65, 0.7],
            aqi_typical: 45.0,
            aqi_variation: 15.0,
            continentality: 0.1,
            maritime_influence: 0.9,
            pollution_level: 0.3,
        },
    },
    City {
        id: "denver",
        name: "Denver",
        country: "USA",
        lat: 39.74,
        lon: -104.99,
        timezone: "America/Denver",
        climate: ClimateProfile {
            temperature: [
                TempRange::new(-8.0, 7.0),
                TempRange::new(2.0, 18.0),
                TempRange::new(15.0, 30.0),
                TempRange::new(3.0, 20.0),
            ],
            humidity: [0.45, 0.5, 0.4, 0.45],
            aqi_typical: 45.0,
            aqi_variation: 15.0,
            continentality: 0.8,
            maritime_influence: 0.1,
            pollution_level: 0.2,
        },
    },
    City {
        id: "los-angeles",
        name: "Los Angeles",
        country: "USA",
        lat: 34.05,
        lon: -118.24,
        timezone: "America/Los_Angeles",
        climate: ClimateProfile {
            temperature: [
                TempRange::new(9.0, 20.0),
                TempRange::new(13.0, 24.0),
                TempRange::new(18.0, 28.0),
                TempRange::new(15.0, 26.0),
            ],
            humidity: [0.65, 0.6, 0.55, 0.6],
            aqi_typical: 65.0,
            aqi_variation: 25.0,
            continentality: 0.3,
            maritime_influence: 0.6,
            pollution_level: 0.6,
        },
    },
    City {
        id: "chicago",
        name: "Chicago",
        country: "USA",
        lat: 41.88,
        lon: -87.63,
        timezone: "America/Chicago",
        climate: ClimateProfile {
            temperature: [
                TempRange::new(-9.0, 0.0),
                TempRange::new(4.0, 17.0),
                TempRange::new(18.0, 29.0),
                TempRange::new(6.0, 18.0),
            ],
            humidity: [0.7, 0.65, 0.6, 0.65],
            aqi_typical: 70.0,
            aqi_variation: 20.0,
            continentality: 0.7,
            maritime_influence: 0.2,
            pollution_level: 0.5,
        },
    },
    City {
        id: "new-york",
        name: "New York",
        country: "USA",
        lat: 40.71,
        lon: -74.01,
        timezone: "America/New_York",
        climate: ClimateProfile {
            temperature: [
                TempRange::new(-3.0, 6.0),
                TempRange::new(8.0, 19.0),
                TempRange::new(20.0, 29.0),
                TempRange::new(10.0, 20.0),
            ],
            humidity: [0.65, 0.6, 0.65, 0.6],
            aqi_typical: 60.0,
            aqi_variation: 20.0,
            continentality: 0.5,
            maritime_influence: 0.4,
            pollution_level: 0.5,
        },
    },
    City {
        id: "miami",
        name: "Miami",
        country: "USA",
        lat: 25.76,
        lon: -80.19,
        timezone: "America/New_York",
        climate: ClimateProfile {
            temperature: [
                TempRange::new(15.0, 24.0),
                TempRange::new(20.0, 28.0),
                TempRange::new(24.0, 32.0),
                TempRange::new(21.0, 29.0),
            ],
            humidity: [0.75, 0.7, 0.8, 0.75],
            aqi_typical: 40.0,
            aqi_variation: 15.0,
            continentality: 0.1,
            maritime_influence: 0.9,
            pollution_level: 0.3,
        },
    },
    City {
        id: "dallas",
        name: "Dallas",
        country: "USA",
        lat: 32.78,
        lon: -96.8,
        timezone: "America/Chicago",
        climate: ClimateProfile {
            temperature: [
                TempRange::new(2.0, 15.0),
                TempRange::new(12.0, 26.0),
                TempRange::new(24.0, 36.0),
                TempRange::new(13.0, 27.0),
            ],
            humidity: [0.6, 0.65, 0.55, 0.6],
            aqi_typical: 75.0,
            aqi_variation: 25.0,
            continentality: 0.7,
            maritime_influence: 0.1,
            pollution_level: 0.6,
        },
    },
    City {
        id: "london",
        name: "London",
        country: "UK",
        lat: 51.51,
        lon: -0.13,
        timezone: "Europe/London",
        climate: ClimateProfile {
            temperature: [
                TempRange::new(2.0, 8.0),
                TempRange::new(6.0, 15.0),
                TempRange::new(12.0, 22.0),
                TempRange::new(7.0, 16.0),
            ],
            humidity: [0.85, 0.75, 0.7, 0.8],
            aqi_typical: 55.0,
            aqi_variation: 20.0,
            continentality: 0.2,
            maritime_influence: 0.8,
            pollution_level: 0.4,
        },
    },
    City {
        id: "frankfurt",
        name: "Frankfurt",
        country: "Germany",
        lat: 50.11,
        lon: 8.68,
        timezone: "Europe/Berlin",
        climate: ClimateProfile {
            temperature: [
                TempRange::new(-1.0, 4.0),
                TempRange::new(5.0, 17.0),
                TempRange::new(14.0, 25.0),
                TempRange::new(6.0, 16.0),
            ],
            humidity: [0.8, 0.7, 0.65, 0.75],
            aqi_typical: 50.0,
            aqi_variation: 15.0,
            continentality: 0.4,
            maritime_influence: 0.5,
            pollution_level: 0.4,
        },
    },
];

pub fn city_by_id(id: &str) -> Option<&'static City> {
    CITIES.iter().find(|c| c.id == id)
}

pub fn seasonal_date_by_id(id: &str) -> Option<&'static SeasonalDate> {
    SEASONAL_DATES.iter().find(|d| d.id == id)
}

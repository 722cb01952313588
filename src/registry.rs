//! Static ISO 3166-1 alpha-2 registry.
//!
//! Maps English country names to their alpha-2 code. Each code lists the ISO
//! short name first, followed by common forms in use on UN documents and in
//! other datasets. Lookup is exact and case-sensitive: names must already be
//! recased and alias-rewritten by [`crate::country`].

use once_cell::sync::Lazy;
use std::collections::HashMap;

static COUNTRIES: &[(&str, &[&str])] = &[
    ("AD", &["Andorra"]),
    ("AE", &["United Arab Emirates"]),
    ("AF", &["Afghanistan"]),
    ("AG", &["Antigua and Barbuda"]),
    ("AI", &["Anguilla"]),
    ("AL", &["Albania"]),
    ("AM", &["Armenia"]),
    ("AO", &["Angola"]),
    ("AQ", &["Antarctica"]),
    ("AR", &["Argentina"]),
    ("AS", &["American Samoa"]),
    ("AT", &["Austria"]),
    ("AU", &["Australia"]),
    ("AW", &["Aruba"]),
    ("AX", &["Åland Islands", "Aland Islands"]),
    ("AZ", &["Azerbaijan"]),
    ("BA", &["Bosnia and Herzegovina"]),
    ("BB", &["Barbados"]),
    ("BD", &["Bangladesh"]),
    ("BE", &["Belgium"]),
    ("BF", &["Burkina Faso"]),
    ("BG", &["Bulgaria"]),
    ("BH", &["Bahrain"]),
    ("BI", &["Burundi"]),
    ("BJ", &["Benin"]),
    ("BL", &["Saint Barthélemy", "Saint Barthelemy"]),
    ("BM", &["Bermuda"]),
    ("BN", &["Brunei Darussalam", "Brunei"]),
    ("BO", &["Bolivia, Plurinational State of", "Bolivia"]),
    ("BQ", &["Bonaire, Sint Eustatius and Saba", "Caribbean Netherlands"]),
    ("BR", &["Brazil"]),
    ("BS", &["Bahamas", "The Bahamas"]),
    ("BT", &["Bhutan"]),
    ("BV", &["Bouvet Island"]),
    ("BW", &["Botswana"]),
    ("BY", &["Belarus"]),
    ("BZ", &["Belize"]),
    ("CA", &["Canada"]),
    ("CC", &["Cocos (Keeling) Islands"]),
    (
        "CD",
        &[
            "Congo, The Democratic Republic of the",
            "Democratic Republic of the Congo",
            "DR Congo",
        ],
    ),
    ("CF", &["Central African Republic"]),
    ("CG", &["Congo", "Republic of the Congo"]),
    ("CH", &["Switzerland"]),
    ("CI", &["Côte d'Ivoire", "Cote d'Ivoire", "Ivory Coast"]),
    ("CK", &["Cook Islands"]),
    ("CL", &["Chile"]),
    ("CM", &["Cameroon"]),
    ("CN", &["China"]),
    ("CO", &["Colombia"]),
    ("CR", &["Costa Rica"]),
    ("CU", &["Cuba"]),
    ("CV", &["Cabo Verde", "Cape Verde"]),
    ("CW", &["Curaçao", "Curacao"]),
    ("CX", &["Christmas Island"]),
    ("CY", &["Cyprus"]),
    ("CZ", &["Czechia", "Czech Republic"]),
    ("DE", &["Germany"]),
    ("DJ", &["Djibouti"]),
    ("DK", &["Denmark"]),
    ("DM", &["Dominica"]),
    ("DO", &["Dominican Republic"]),
    ("DZ", &["Algeria"]),
    ("EC", &["Ecuador"]),
    ("EE", &["Estonia"]),
    ("EG", &["Egypt"]),
    ("EH", &["Western Sahara"]),
    ("ER", &["Eritrea"]),
    ("ES", &["Spain"]),
    ("ET", &["Ethiopia"]),
    ("FI", &["Finland"]),
    ("FJ", &["Fiji"]),
    ("FK", &["Falkland Islands (Malvinas)", "Falkland Islands"]),
    ("FM", &["Micronesia, Federated States of", "Micronesia"]),
    ("FO", &["Faroe Islands"]),
    ("FR", &["France"]),
    ("GA", &["Gabon"]),
    ("GB", &["United Kingdom", "Great Britain"]),
    ("GD", &["Grenada"]),
    ("GE", &["Georgia"]),
    ("GF", &["French Guiana"]),
    ("GG", &["Guernsey"]),
    ("GH", &["Ghana"]),
    ("GI", &["Gibraltar"]),
    ("GL", &["Greenland"]),
    ("GM", &["Gambia", "The Gambia"]),
    ("GN", &["Guinea"]),
    ("GP", &["Guadeloupe"]),
    ("GQ", &["Equatorial Guinea"]),
    ("GR", &["Greece"]),
    ("GS", &["South Georgia and the South Sandwich Islands"]),
    ("GT", &["Guatemala"]),
    ("GU", &["Guam"]),
    ("GW", &["Guinea-Bissau"]),
    ("GY", &["Guyana"]),
    ("HK", &["Hong Kong"]),
    ("HM", &["Heard Island and McDonald Islands"]),
    ("HN", &["Honduras"]),
    ("HR", &["Croatia"]),
    ("HT", &["Haiti"]),
    ("HU", &["Hungary"]),
    ("ID", &["Indonesia"]),
    ("IE", &["Ireland"]),
    ("IL", &["Israel"]),
    ("IM", &["Isle of Man"]),
    ("IN", &["India"]),
    ("IO", &["British Indian Ocean Territory"]),
    ("IQ", &["Iraq"]),
    ("IR", &["Iran, Islamic Republic of", "Iran"]),
    ("IS", &["Iceland"]),
    ("IT", &["Italy"]),
    ("JE", &["Jersey"]),
    ("JM", &["Jamaica"]),
    ("JO", &["Jordan"]),
    ("JP", &["Japan"]),
    ("KE", &["Kenya"]),
    ("KG", &["Kyrgyzstan"]),
    ("KH", &["Cambodia"]),
    ("KI", &["Kiribati"]),
    ("KM", &["Comoros"]),
    ("KN", &["Saint Kitts and Nevis"]),
    (
        "KP",
        &["Korea, Democratic People's Republic of", "North Korea"],
    ),
    ("KR", &["Korea, Republic of", "South Korea"]),
    ("KW", &["Kuwait"]),
    ("KY", &["Cayman Islands"]),
    ("KZ", &["Kazakhstan"]),
    ("LA", &["Lao People's Democratic Republic", "Laos"]),
    ("LB", &["Lebanon"]),
    ("LC", &["Saint Lucia"]),
    ("LI", &["Liechtenstein"]),
    ("LK", &["Sri Lanka"]),
    ("LR", &["Liberia"]),
    ("LS", &["Lesotho"]),
    ("LT", &["Lithuania"]),
    ("LU", &["Luxembourg"]),
    ("LV", &["Latvia"]),
    ("LY", &["Libya"]),
    ("MA", &["Morocco"]),
    ("MC", &["Monaco"]),
    ("MD", &["Moldova, Republic of", "Republic of Moldova", "Moldova"]),
    ("ME", &["Montenegro"]),
    ("MF", &["Saint Martin (French part)", "Saint Martin"]),
    ("MG", &["Madagascar"]),
    ("MH", &["Marshall Islands"]),
    ("MK", &["North Macedonia", "Macedonia"]),
    ("ML", &["Mali"]),
    ("MM", &["Myanmar", "Burma"]),
    ("MN", &["Mongolia"]),
    ("MO", &["Macao", "Macau"]),
    ("MP", &["Northern Mariana Islands"]),
    ("MQ", &["Martinique"]),
    ("MR", &["Mauritania"]),
    ("MS", &["Montserrat"]),
    ("MT", &["Malta"]),
    ("MU", &["Mauritius"]),
    ("MV", &["Maldives"]),
    ("MW", &["Malawi"]),
    ("MX", &["Mexico"]),
    ("MY", &["Malaysia"]),
    ("MZ", &["Mozambique"]),
    ("NA", &["Namibia"]),
    ("NC", &["New Caledonia"]),
    ("NE", &["Niger"]),
    ("NF", &["Norfolk Island"]),
    ("NG", &["Nigeria"]),
    ("NI", &["Nicaragua"]),
    ("NL", &["Netherlands", "The Netherlands"]),
    ("NO", &["Norway"]),
    ("NP", &["Nepal"]),
    ("NR", &["Nauru"]),
    ("NU", &["Niue"]),
    ("NZ", &["New Zealand"]),
    ("OM", &["Oman"]),
    ("PA", &["Panama"]),
    ("PE", &["Peru"]),
    ("PF", &["French Polynesia"]),
    ("PG", &["Papua New Guinea"]),
    ("PH", &["Philippines"]),
    ("PK", &["Pakistan"]),
    ("PL", &["Poland"]),
    ("PM", &["Saint Pierre and Miquelon"]),
    ("PN", &["Pitcairn"]),
    ("PR", &["Puerto Rico"]),
    ("PS", &["Palestine, State of", "Palestine"]),
    ("PT", &["Portugal"]),
    ("PW", &["Palau"]),
    ("PY", &["Paraguay"]),
    ("QA", &["Qatar"]),
    ("RE", &["Réunion", "Reunion"]),
    ("RO", &["Romania"]),
    ("RS", &["Serbia"]),
    ("RU", &["Russian Federation", "Russia"]),
    ("RW", &["Rwanda"]),
    ("SA", &["Saudi Arabia"]),
    ("SB", &["Solomon Islands"]),
    ("SC", &["Seychelles"]),
    ("SD", &["Sudan"]),
    ("SE", &["Sweden"]),
    ("SG", &["Singapore"]),
    ("SH", &["Saint Helena, Ascension and Tristan da Cunha", "Saint Helena"]),
    ("SI", &["Slovenia"]),
    ("SJ", &["Svalbard and Jan Mayen"]),
    ("SK", &["Slovakia"]),
    ("SL", &["Sierra Leone"]),
    ("SM", &["San Marino"]),
    ("SN", &["Senegal"]),
    ("SO", &["Somalia"]),
    ("SR", &["Suriname"]),
    ("SS", &["South Sudan"]),
    ("ST", &["Sao Tome and Principe"]),
    ("SV", &["El Salvador"]),
    ("SX", &["Sint Maarten (Dutch part)", "Sint Maarten"]),
    ("SY", &["Syrian Arab Republic", "Syria"]),
    ("SZ", &["Eswatini", "Swaziland"]),
    ("TC", &["Turks and Caicos Islands"]),
    ("TD", &["Chad"]),
    ("TF", &["French Southern Territories"]),
    ("TG", &["Togo"]),
    ("TH", &["Thailand"]),
    ("TJ", &["Tajikistan"]),
    ("TK", &["Tokelau"]),
    ("TL", &["Timor-Leste", "East Timor"]),
    ("TM", &["Turkmenistan"]),
    ("TN", &["Tunisia"]),
    ("TO", &["Tonga"]),
    ("TR", &["Türkiye", "Turkey"]),
    ("TT", &["Trinidad and Tobago"]),
    ("TV", &["Tuvalu"]),
    ("TW", &["Taiwan, Province of China", "Taiwan"]),
    (
        "TZ",
        &["Tanzania, United Republic of", "United Republic of Tanzania", "Tanzania"],
    ),
    ("UA", &["Ukraine"]),
    ("UG", &["Uganda"]),
    ("UM", &["United States Minor Outlying Islands"]),
    ("US", &["United States", "United States of America"]),
    ("UY", &["Uruguay"]),
    ("UZ", &["Uzbekistan"]),
    ("VA", &["Holy See (Vatican City State)", "Holy See", "Vatican City"]),
    ("VC", &["Saint Vincent and the Grenadines"]),
    ("VE", &["Venezuela, Bolivarian Republic of", "Venezuela"]),
    ("VG", &["Virgin Islands, British", "British Virgin Islands"]),
    ("VI", &["Virgin Islands, U.S.", "United States Virgin Islands"]),
    ("VN", &["Viet Nam", "Vietnam"]),
    ("VU", &["Vanuatu"]),
    ("WF", &["Wallis and Futuna"]),
    ("WS", &["Samoa"]),
    ("YE", &["Yemen"]),
    ("YT", &["Mayotte"]),
    ("ZA", &["South Africa"]),
    ("ZM", &["Zambia"]),
    ("ZW", &["Zimbabwe"]),
];

static BY_NAME: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    COUNTRIES
        .iter()
        .flat_map(|(code, names)| names.iter().map(move |name| (*name, *code)))
        .collect()
});

/// Look up the ISO 3166-1 alpha-2 code of a canonical country name.
pub fn alpha2(name: &str) -> Option<&'static str> {
    BY_NAME.get(name).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_alpha2_known_names() {
        assert_eq!(alpha2("United States"), Some("US"));
        assert_eq!(alpha2("Iran"), Some("IR"));
        assert_eq!(alpha2("Russian Federation"), Some("RU"));
        assert_eq!(alpha2("Lao People's Democratic Republic"), Some("LA"));
    }

    #[test]
    fn test_alpha2_is_case_sensitive() {
        assert_eq!(alpha2("united states"), None);
        assert_eq!(alpha2("Antigua And Barbuda"), None);
    }

    #[test]
    fn test_alpha2_unknown_name() {
        assert_eq!(alpha2("Yugoslavia"), None);
        assert_eq!(alpha2(""), None);
    }

    #[test]
    fn test_codes_and_names_are_unique() {
        let mut codes = HashSet::new();
        let mut names = HashSet::new();
        for (code, aliases) in COUNTRIES {
            assert_eq!(code.len(), 2, "bad code {code}");
            assert!(codes.insert(*code), "duplicate code {code}");
            for name in *aliases {
                assert!(names.insert(*name), "duplicate name {name}");
            }
        }
        assert_eq!(codes.len(), 249);
    }
}

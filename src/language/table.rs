//! ISO 639 language table.
//!
//! Columns: ISO 639-1 code, ISO 639-2/T code, English name, native name.

pub(super) struct IsoLanguage {
    pub code: &'static str,
    pub iso3: &'static str,
    pub name: &'static str,
    pub native_name: &'static str,
}

const fn lang(
    code: &'static str,
    iso3: &'static str,
    name: &'static str,
    native_name: &'static str,
) -> IsoLanguage {
    IsoLanguage {
        code,
        iso3,
        name,
        native_name,
    }
}

pub(super) static ISO_LANGUAGES: &[IsoLanguage] = &[
    lang("af", "afr", "Afrikaans", "Afrikaans"),
    lang("ar", "ara", "Arabic", "العربية"),
    lang("be", "bel", "Belarusian", "беларуская"),
    lang("bg", "bul", "Bulgarian", "български"),
    lang("bn", "ben", "Bengali", "বাংলা"),
    lang("br", "bre", "Breton", "brezhoneg"),
    lang("bs", "bos", "Bosnian", "bosanski"),
    lang("ca", "cat", "Catalan", "català"),
    lang("ch", "cha", "Chamorro", "Chamoru"),
    lang("cs", "ces", "Czech", "čeština"),
    lang("cy", "cym", "Welsh", "Cymraeg"),
    lang("da", "dan", "Danish", "dansk"),
    lang("de", "deu", "German", "Deutsch"),
    lang("el", "ell", "Greek", "Ελληνικά"),
    lang("en", "eng", "English", "English"),
    lang("eo", "epo", "Esperanto", "esperanto"),
    lang("es", "spa", "Spanish", "español"),
    lang("et", "est", "Estonian", "eesti"),
    lang("eu", "eus", "Basque", "euskara"),
    lang("fa", "fas", "Persian", "فارسی"),
    lang("fi", "fin", "Finnish", "suomi"),
    lang("fr", "fra", "French", "français"),
    lang("ga", "gle", "Irish", "Gaeilge"),
    lang("gl", "glg", "Galician", "galego"),
    lang("he", "heb", "Hebrew", "עברית"),
    lang("hi", "hin", "Hindi", "हिन्दी"),
    lang("hr", "hrv", "Croatian", "hrvatski"),
    lang("hu", "hun", "Hungarian", "magyar"),
    lang("hy", "hye", "Armenian", "հայերեն"),
    lang("id", "ind", "Indonesian", "Indonesia"),
    lang("is", "isl", "Icelandic", "íslenska"),
    lang("it", "ita", "Italian", "italiano"),
    lang("ja", "jpn", "Japanese", "日本語"),
    lang("ka", "kat", "Georgian", "ქართული"),
    lang("kk", "kaz", "Kazakh", "қазақ тілі"),
    lang("ko", "kor", "Korean", "한국어"),
    lang("la", "lat", "Latin", "latine"),
    lang("lb", "ltz", "Luxembourgish", "Lëtzebuergesch"),
    lang("lt", "lit", "Lithuanian", "lietuvių"),
    lang("lv", "lav", "Latvian", "latviešu"),
    lang("mk", "mkd", "Macedonian", "македонски"),
    lang("ms", "msa", "Malay", "Melayu"),
    lang("mt", "mlt", "Maltese", "Malti"),
    lang("nb", "nob", "Norwegian Bokmål", "norsk bokmål"),
    lang("nl", "nld", "Dutch", "Nederlands"),
    lang("nn", "nno", "Norwegian Nynorsk", "nynorsk"),
    lang("no", "nor", "Norwegian", "norsk"),
    lang("pl", "pol", "Polish", "polski"),
    lang("pt", "por", "Portuguese", "português"),
    lang("rm", "roh", "Romansh", "rumantsch"),
    lang("ro", "ron", "Romanian", "română"),
    lang("ru", "rus", "Russian", "русский"),
    lang("sk", "slk", "Slovak", "slovenčina"),
    lang("sl", "slv", "Slovenian", "slovenščina"),
    lang("sq", "sqi", "Albanian", "shqip"),
    lang("sr", "srp", "Serbian", "српски"),
    lang("sv", "swe", "Swedish", "svenska"),
    lang("sw", "swa", "Swahili", "Kiswahili"),
    lang("ta", "tam", "Tamil", "தமிழ்"),
    lang("th", "tha", "Thai", "ไทย"),
    lang("tr", "tur", "Turkish", "Türkçe"),
    lang("uk", "ukr", "Ukrainian", "українська"),
    lang("ur", "urd", "Urdu", "اردو"),
    lang("vi", "vie", "Vietnamese", "Tiếng Việt"),
    lang("zh", "zho", "Chinese", "中文"),
];
